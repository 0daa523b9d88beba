//! Text embedding facade.
//!
//! The pipeline only needs `text -> fixed-length vector`; backends live behind
//! the [`Embedder`] trait so tests and offline builds can swap in the
//! model-free [`HashingEmbedder`] while production builds call a remote model.

mod hashing;
mod http;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;

use async_trait::async_trait;
use core_types::config::{EmbedderBackend, EmbedderConfig};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("embedding backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("embedder misconfigured: {0}")]
    Config(String),
}

/// Turns raw text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Build the backend selected in configuration.
pub fn from_config(cfg: &EmbedderConfig, dimensions: usize) -> Result<Arc<dyn Embedder>, EmbedError> {
    let embedder: Arc<dyn Embedder> = match cfg.backend {
        EmbedderBackend::Hashing => Arc::new(HashingEmbedder::new(dimensions)),
        EmbedderBackend::Http => Arc::new(HttpEmbedder::from_config(cfg, dimensions)?),
    };
    tracing::info!(
        backend = embedder.name(),
        dimensions,
        model = %cfg.model,
        "embedder ready"
    );
    Ok(embedder)
}

/// Scale `v` to unit length in place; zero vectors are left as is.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
