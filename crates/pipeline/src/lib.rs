//! Build-pipeline integration: the lifecycle hooks a site generator calls to
//! embed posts, index them, and attach related posts, plus tracing bootstrap.
//!
//! [`Pipeline`] owns the embedder and the related-content index for one build.
//! The orchestrator constructs it once through [`Pipeline::initialize`] and
//! passes it by reference into the per-post hooks.

mod batch;
mod hooks;
mod logging;
pub mod status;

pub use batch::Stage;
pub use logging::{init_tracing, init_tracing_with_config};
pub use status::{BuildReport, PostFailure};

use core_types::config::AppConfig;
use embedder::{EmbedError, Embedder};
use parking_lot::Mutex;
use semantic_index::{RelatedIndex, SemanticError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("embedder initialisation failed: {0}")]
    Init(#[from] EmbedError),
    #[error("failed to embed {key}: {source}")]
    Embed {
        key: String,
        #[source]
        source: EmbedError,
    },
    #[error("failed to index {key}: {source}")]
    Index {
        key: String,
        #[source]
        source: SemanticError,
    },
    #[error("related posts for {key} unavailable: {source}")]
    Related {
        key: String,
        #[source]
        source: SemanticError,
    },
}

impl PipelineError {
    /// True for invariant breaches inside the index, as opposed to bad input.
    pub const fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            Self::Related {
                source: SemanticError::ConsistencyViolation { .. },
                ..
            } | Self::Index {
                source: SemanticError::ConsistencyViolation { .. },
                ..
            }
        )
    }
}

/// Embedder plus related-content index for a single build.
pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    // Slot assignment reads then writes; every index access goes through this lock.
    index: Mutex<RelatedIndex>,
    neighbors: usize,
    concurrency: usize,
}

impl Pipeline {
    /// Initialisation hook: construct the embedder and a similarity index
    /// sized from `cfg` before any post is processed.
    pub fn initialize(cfg: &AppConfig) -> Result<Self, PipelineError> {
        cfg.validate()
            .map_err(|e| PipelineError::Config(format!("{e:#}")))?;

        let semantic = &cfg.semantic;
        let embedder = embedder::from_config(&cfg.embedder, semantic.dimensions)?;
        let index = RelatedIndex::from_config(semantic);
        tracing::info!(
            dimensions = semantic.dimensions,
            capacity = semantic.capacity,
            neighbors = semantic.neighbors,
            metric = ?semantic.metric,
            "related-content index initialised"
        );

        Ok(Self::new(embedder, index, semantic.neighbors)
            .with_concurrency(cfg.embedder.concurrency))
    }

    pub fn new(embedder: Arc<dyn Embedder>, index: RelatedIndex, neighbors: usize) -> Self {
        Self {
            embedder,
            index: Mutex::new(index),
            neighbors,
            concurrency: 1,
        }
    }

    /// Posts embedded concurrently by [`Pipeline::process_posts`].
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub const fn neighbors(&self) -> usize {
        self.neighbors
    }

    pub fn embedder_name(&self) -> &'static str {
        self.embedder.name()
    }

    /// Number of posts registered in the index so far.
    pub fn indexed(&self) -> usize {
        self.index.lock().len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("embedder", &self.embedder.name())
            .field("index", &*self.index.lock())
            .field("neighbors", &self.neighbors)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
