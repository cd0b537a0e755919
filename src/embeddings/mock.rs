//! Deterministic embedding provider for tests and offline runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::types::VaultError;

use super::EmbeddingProvider;

/// Default vector length for mock embeddings.
pub const MOCK_DIMENSION: usize = 64;

/// Hashed bag-of-tokens embeddings, L2-normalized.
///
/// Identical text always produces the identical vector, and texts sharing
/// tokens land closer together under cosine similarity than unrelated texts,
/// so retrieval ordering in tests is meaningful without a real model.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            dimension: MOCK_DIMENSION,
        }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let slot = (hasher.finish() as usize) % self.dimension;
            vector[slot] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            // Token-free input still gets a valid unit vector.
            vector[0] = 1.0;
        } else {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, VaultError> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2], "identical text, identical vector");
        assert_ne!(first[0], first[1], "different text, different vector");
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let provider = MockEmbeddingProvider::with_dimension(16);
        let vectors = provider
            .embed_batch(&["some text".to_string(), "".to_string()])
            .await
            .unwrap();
        for vector in vectors {
            assert_eq!(vector.len(), 16);
            let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn token_overlap_drives_similarity() {
        let provider = MockEmbeddingProvider::new();
        let vectors = provider
            .embed_batch(&[
                "quantum mechanics and atomic physics".to_string(),
                "quantum mechanics question".to_string(),
                "gardening tips for spring".to_string(),
            ])
            .await
            .unwrap();

        let related = cosine(&vectors[0], &vectors[1]);
        let unrelated = cosine(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }
}
