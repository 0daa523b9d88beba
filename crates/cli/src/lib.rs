//! Helpers behind the `kindred` binary: loading a directory of posts and
//! shaping build output.

use anyhow::{Context, Result};
use core_types::PostRecord;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File extensions treated as posts.
pub const POST_EXTENSIONS: &[&str] = &["md", "markdown", "html", "txt"];

/// A file under the post directory that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPost {
    pub path: String,
    pub reason: String,
}

/// Posts loaded from a directory, plus the files that were skipped.
#[derive(Debug, Default)]
pub struct LoadedPosts {
    pub posts: Vec<PostRecord>,
    pub skipped: Vec<SkippedPost>,
}

/// Load every post under `root`, sorted by key.
///
/// Keys are paths relative to `root` with `/` separators, so the same site
/// produces the same keys on every platform. An entry that cannot be walked or
/// read is logged and skipped; the rest still load. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn load_posts(root: &Path) -> LoadedPosts {
    let mut loaded = LoadedPosts::default();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map_or_else(|| root.display().to_string(), |p| p.display().to_string());
                loaded.skip(path, &err);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_post(entry.path()) {
            continue;
        }
        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(err) => {
                loaded.skip(entry.path().display().to_string(), &err);
                continue;
            }
        };
        let raw = String::from_utf8_lossy(&bytes);
        if matches!(raw, Cow::Owned(_)) {
            warn!(path = %entry.path().display(), "post is not valid UTF-8; invalid bytes replaced");
        }
        match relative_key(root, entry.path()) {
            Ok(key) => loaded.posts.push(parse_post(key, &raw)),
            Err(err) => loaded.skip(entry.path().display().to_string(), &err),
        }
    }
    loaded.posts.sort_by(|a, b| a.path.cmp(&b.path));
    loaded
}

impl LoadedPosts {
    fn skip(&mut self, path: String, err: &dyn fmt::Display) {
        warn!(%path, error = %err, "skipping unreadable post");
        self.skipped.push(SkippedPost {
            reason: err.to_string(),
            path,
        });
    }
}

fn is_post(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| POST_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

/// Build a post from raw file contents, lifting `title:` out of any front matter.
pub fn parse_post(key: String, raw: &str) -> PostRecord {
    let (title, body) = strip_front_matter(raw);
    let mut post = PostRecord::new(key, body);
    post.title = title;
    post
}

/// Split a leading `---` delimited YAML block from the body.
///
/// Returns the `title:` value if the block has one. Text without a closed
/// front-matter block is returned unchanged.
pub fn strip_front_matter(raw: &str) -> (Option<String>, &str) {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            let header = &rest[..offset - line.len()];
            return (front_matter_title(header), &rest[offset..]);
        }
    }
    (None, raw)
}

fn front_matter_title(header: &str) -> Option<String> {
    header.lines().find_map(|line| {
        let value = line.strip_prefix("title:")?.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        (!value.is_empty()).then(|| value.to_owned())
    })
}

/// One line of `kindred related` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub related: Vec<String>,
}

impl From<&PostRecord> for RelatedEntry {
    fn from(post: &PostRecord) -> Self {
        Self {
            path: post.path.clone(),
            title: post.title.clone(),
            related: post.related_posts.clone(),
        }
    }
}
