//! Process configuration.
//!
//! One [`VaultConfig`] value is built in `main` and passed by reference into
//! each component's constructor; no component reads ambient global state.
//! Values come from typed defaults with environment-variable overrides
//! (loaded through `dotenvy`, so a `.env` file works too).

use std::env;
use std::path::PathBuf;

use crate::embeddings::ollama;
use crate::store::DistanceMetric;
use crate::types::VaultError;

/// Chunker settings.
#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding provider settings.
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding server.
    pub endpoint: String,
    /// Model name requested from the provider.
    pub model: String,
    /// Texts per provider call.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: ollama::DEFAULT_ENDPOINT.to_string(),
            model: ollama::DEFAULT_MODEL.to_string(),
            batch_size: 32,
        }
    }
}

/// Vector store settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// SQLite database location.
    pub path: PathBuf,
    /// Collection name.
    pub collection: String,
    /// Distance metric fixed at collection creation.
    pub metric: DistanceMetric,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/ragvault.sqlite"),
            collection: "ragvault".to_string(),
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Complete configuration for one process.
#[derive(Clone, Debug, Default)]
pub struct VaultConfig {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
}

impl VaultConfig {
    /// Defaults overridden by `RAGVAULT_*` environment variables.
    pub fn from_env() -> Result<Self, VaultError> {
        // Best effort; a missing .env file is fine.
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(value) = read_env("RAGVAULT_CHUNK_SIZE") {
            config.chunking.chunk_size = parse_env("RAGVAULT_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = read_env("RAGVAULT_CHUNK_OVERLAP") {
            config.chunking.chunk_overlap = parse_env("RAGVAULT_CHUNK_OVERLAP", &value)?;
        }
        if let Some(value) = read_env("RAGVAULT_EMBEDDING_ENDPOINT") {
            config.embedding.endpoint = value;
        }
        if let Some(value) = read_env("RAGVAULT_EMBEDDING_MODEL") {
            config.embedding.model = value;
        }
        if let Some(value) = read_env("RAGVAULT_EMBEDDING_BATCH_SIZE") {
            config.embedding.batch_size = parse_env("RAGVAULT_EMBEDDING_BATCH_SIZE", &value)?;
        }
        if let Some(value) = read_env("RAGVAULT_DB_PATH") {
            config.storage.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("RAGVAULT_COLLECTION") {
            config.storage.collection = value;
        }
        if let Some(value) = read_env("RAGVAULT_DISTANCE_METRIC") {
            config.storage.metric = value.parse()?;
        }
        Ok(config)
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_env(key: &str, value: &str) -> Result<usize, VaultError> {
    value
        .parse()
        .map_err(|_| VaultError::Config(format!("{key} must be a positive integer, got '{value}'")))
}
