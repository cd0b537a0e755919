//! Shared record types and the crate-wide error taxonomy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the ingestion and retrieval pipeline.
///
/// Chunking and embedding failures abort the current batch with no partial
/// persistence. Storage failures are fatal to the current call; there is no
/// automatic retry. Structurally invalid records (a chunk missing its text or
/// embedding) are skipped with a warning instead, see
/// [`store::SqliteVectorStore::upsert`](crate::store::SqliteVectorStore::upsert).
#[derive(Debug, Error)]
pub enum VaultError {
    /// A document could not be loaded (missing file, unsupported format).
    #[error("failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    /// The chunker was configured with invalid parameters.
    #[error("invalid chunking configuration: {0}")]
    Chunking(String),

    /// The embedding provider failed or returned malformed output.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector's length disagrees with the collection schema.
    #[error(
        "dimension mismatch for collection '{collection}': expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// The storage backend was unreachable or a collection operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem failure outside the storage backend.
    #[error("io error: {0}")]
    Io(String),

    /// Environment configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Io(err.to_string())
    }
}

/// A scalar payload value.
///
/// Payloads stored alongside vectors are flat maps of string keys to this
/// closed scalar set, never nested structures, so the stored schema stays
/// enumerable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    /// Returns the string contents when the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the integer contents when the value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Str(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        MetaValue::Int(value as i64)
    }
}

impl From<u64> for MetaValue {
    fn from(value: u64) -> Self {
        MetaValue::Int(value as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

/// Flat metadata map attached to chunks and stored points.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A loaded source document, immutable once produced by the loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Path the document was read from.
    pub source: String,
    /// Decoded text content, never raw bytes.
    pub content: String,
    /// File extension tag including the leading dot, e.g. `.md`.
    pub format: String,
    /// Size of the source file in bytes.
    pub size: u64,
}

impl Document {
    pub fn new(
        source: impl Into<String>,
        content: impl Into<String>,
        format: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            format: format.into(),
            size,
        }
    }

    /// Metadata carried into every chunk of this document: all fields except
    /// the content itself.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("source".to_string(), MetaValue::from(self.source.clone()));
        meta.insert("format".to_string(), MetaValue::from(self.format.clone()));
        meta.insert("size".to_string(), MetaValue::from(self.size));
        meta
    }
}
