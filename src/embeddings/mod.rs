//! Embedding adapter: the provider contract plus a thin wrapper that owns
//! batching and dimension discovery.
//!
//! The wrapper never invents vectors: provider failures propagate as typed
//! errors, and any disagreement between input and output lengths, or between
//! a returned vector and the discovered dimension, fails loudly.

pub mod mock;
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::chunking::Chunk;
use crate::types::VaultError;

pub use mock::MockEmbeddingProvider;
pub use ollama::OllamaEmbeddingProvider;

/// Default number of texts per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Contract for turning text into fixed-dimension vectors.
///
/// Implementations must preserve input order and return one vector per input
/// string.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Human-readable provider name for diagnostics.
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, VaultError>;
}

/// Provider wrapper with a fixed, probe-discovered dimension.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    batch_size: usize,
}

impl Embedder {
    /// Wrap a provider, discovering its dimension by embedding a probe
    /// string once. The dimension is fixed for the wrapper's lifetime.
    pub async fn probe(provider: Arc<dyn EmbeddingProvider>) -> Result<Self, VaultError> {
        let sample = provider
            .embed_batch(&["dimension probe".to_string()])
            .await?;
        let dimension = sample
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| {
                VaultError::Embedding(format!(
                    "provider '{}' returned no usable vector for the dimension probe",
                    provider.name()
                ))
            })?;
        debug!(
            provider = provider.name(),
            dimension, "discovered embedding dimension"
        );
        Ok(Self {
            provider,
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set the number of texts sent per provider call.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Vector length this adapter produces, fixed at construction.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed texts in input order. An empty input returns an empty vec
    /// without contacting the provider.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VaultError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let produced = self.provider.embed_batch(batch).await?;
            if produced.len() != batch.len() {
                return Err(VaultError::Embedding(format!(
                    "provider '{}' returned {} vectors for {} inputs",
                    self.provider.name(),
                    produced.len(),
                    batch.len()
                )));
            }
            vectors.extend(produced);
        }

        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(VaultError::Embedding(format!(
                    "provider '{}' returned a vector of length {}, expected {}",
                    self.provider.name(),
                    vector.len(),
                    self.dimension
                )));
            }
        }
        Ok(vectors)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, VaultError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed(&texts).await?;
        vectors.pop().ok_or_else(|| {
            VaultError::Embedding(format!(
                "provider '{}' returned no vector for a single input",
                self.provider.name()
            ))
        })
    }

    /// Attach embeddings to chunks, positionally zipped. Fails loudly if the
    /// produced sequence diverges from the chunk count.
    pub async fn embed_chunks(&self, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>, VaultError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(VaultError::Embedding(format!(
                "embedding count {} diverges from chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = Some(vector);
        }
        debug!(chunks = chunks.len(), "attached embeddings to chunks");
        Ok(chunks)
    }
}
