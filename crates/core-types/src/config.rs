//! Application configuration loaded from `kindred.toml` plus environment overrides.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "kindred.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub semantic: SemanticConfig,
    pub embedder: EmbedderConfig,
    pub logging: LoggingConfig,
}

/// Distance used by the similarity index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    L2,
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Embedding dimensionality; fixed by the embedding model.
    pub dimensions: usize,
    /// Maximum number of posts the similarity index can hold.
    pub capacity: usize,
    /// Neighbours requested per query, counting the post itself.
    pub neighbors: usize,
    pub metric: Metric,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            dimensions: 384,
            capacity: 1024,
            neighbors: 5,
            metric: Metric::L2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderBackend {
    #[default]
    Hashing,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub backend: EmbedderBackend,
    /// OpenAI-compatible embeddings endpoint (http backend only).
    pub endpoint: Option<String>,
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    /// Posts embedded concurrently during a build.
    pub concurrency: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderBackend::Hashing,
            endpoint: None,
            model: "all-MiniLM-L6-v2".into(),
            api_key_env: None,
            timeout_secs: 30,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Optional log file; stderr only when unset.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

impl AppConfig {
    /// Reject settings the index cannot be built with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.semantic;
        if s.dimensions == 0 {
            bail!("semantic.dimensions must be greater than zero");
        }
        if s.capacity == 0 {
            bail!("semantic.capacity must be greater than zero");
        }
        if u32::try_from(s.capacity).is_err() {
            bail!("semantic.capacity must fit in a 32-bit slot id");
        }
        if s.neighbors < 2 {
            bail!("semantic.neighbors must be at least 2 (the post itself plus one neighbour)");
        }
        if self.embedder.backend == EmbedderBackend::Http && self.embedder.endpoint.is_none() {
            bail!("embedder.endpoint is required for the http backend");
        }
        Ok(())
    }

    /// Apply `KINDRED_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_usize("KINDRED_DIMENSIONS")? {
            self.semantic.dimensions = v;
        }
        if let Some(v) = env_usize("KINDRED_CAPACITY")? {
            self.semantic.capacity = v;
        }
        if let Some(v) = env_usize("KINDRED_NEIGHBORS")? {
            self.semantic.neighbors = v;
        }
        if let Ok(level) = env::var("KINDRED_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(endpoint) = env::var("KINDRED_EMBEDDER_ENDPOINT") {
            self.embedder.endpoint = Some(endpoint);
            self.embedder.backend = EmbedderBackend::Http;
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}")),
        Err(_) => Ok(None),
    }
}

/// Read `path` (or `kindred.toml` in the working directory), writing a default
/// file first when none exists. Environment overrides are applied afterwards.
pub fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    let path: PathBuf = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str::<AppConfig>(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?
    } else {
        let cfg = AppConfig::default();
        let rendered = toml::to_string_pretty(&cfg).context("failed to render default config")?;
        fs::write(&path, rendered)
            .with_context(|| format!("failed to write default config {}", path.display()))?;
        cfg
    };

    cfg.apply_env_overrides()?;
    cfg.validate()?;
    Ok(cfg)
}
