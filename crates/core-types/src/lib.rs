//! Core identifiers and shared lightweight types for Kindred.
//!
//! These types intentionally avoid heavy dependencies so that the index,
//! embedder, pipeline, and CLI crates can all share them.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub mod config;

/// Dense slot number inside the fixed-capacity similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Externally meaningful identifier of a piece of content (its site path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for ContentKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ContentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A post as it flows through the build: raw content in, embedding and
/// related keys attached by the pipeline hooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRecord {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_vector: Option<Vec<f32>>,
    #[serde(default)]
    pub related_posts: Vec<String>,
}

impl PostRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> ContentKey {
        ContentKey::new(self.path.as_str())
    }
}
