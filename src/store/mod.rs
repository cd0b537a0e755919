//! Vector collection storage.
//!
//! One [`SqliteVectorStore`] owns the identity, schema (dimension + distance
//! metric), and lifecycle of a single named collection of embedded chunks,
//! persisted in SQLite with similarity search via the `sqlite-vec`
//! extension.
//!
//! ```text
//! embedded chunks ──► upsert ──► points (id, collection, payload, vector)
//! query vector    ──► search ──► ranked hits (id, score, payload)
//! ```

pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Metadata, MetaValue, VaultError};

pub use sqlite::SqliteVectorStore;

/// Ranking function for a collection, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity; scores in `[-1, 1]`, reported as `1 - distance`.
    Cosine,
    /// Inner product; unbounded scores.
    Dot,
    /// Euclidean distance, negated so higher is always better.
    Euclidean,
}

impl DistanceMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Dot => "dot",
            DistanceMetric::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "dot" => Ok(DistanceMetric::Dot),
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            other => Err(VaultError::Config(format!(
                "unknown distance metric '{other}' (expected cosine, dot, or euclidean)"
            ))),
        }
    }
}

/// One stored unit: identifier, vector, and flat payload. Owned by the
/// storage backend once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Metadata,
}

impl StoredPoint {
    /// Mint a point with a fresh identifier. Identity is never derived from
    /// content, so writing the same payload twice yields two distinct points.
    pub fn new(vector: Vec<f32>, payload: Metadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            payload,
        }
    }
}

/// One ranked search result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Metadata,
}

impl SearchHit {
    /// Chunk text carried in the payload.
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(MetaValue::as_str)
    }

    /// Source identifier carried in the payload.
    pub fn source(&self) -> Option<&str> {
        self.payload.get("source").and_then(MetaValue::as_str)
    }
}

/// Read-only snapshot of a collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub total_points: usize,
    pub indexed_points: usize,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_round_trips_through_strings() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::Dot,
            DistanceMetric::Euclidean,
        ] {
            assert_eq!(metric.as_str().parse::<DistanceMetric>().unwrap(), metric);
        }
        assert!(matches!(
            "manhattan".parse::<DistanceMetric>(),
            Err(VaultError::Config(_))
        ));
    }

    #[test]
    fn stored_points_mint_unique_ids() {
        let mut payload = Metadata::new();
        payload.insert("text".into(), MetaValue::from("same content"));

        let first = StoredPoint::new(vec![1.0, 0.0], payload.clone());
        let second = StoredPoint::new(vec![1.0, 0.0], payload.clone());

        assert_ne!(first.id, second.id);
        assert_eq!(first.vector, second.vector);
        assert_eq!(first.payload, payload);
    }

    #[test]
    fn search_hit_accessors_read_the_payload() {
        let mut payload = Metadata::new();
        payload.insert("text".into(), MetaValue::from("a chunk"));
        payload.insert("source".into(), MetaValue::from("doc.md"));
        let hit = SearchHit {
            id: "p1".into(),
            score: 0.9,
            payload,
        };
        assert_eq!(hit.text(), Some("a chunk"));
        assert_eq!(hit.source(), Some("doc.md"));
    }
}
