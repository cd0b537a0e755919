//! Ingest and query coordination.
//!
//! Each call is a sequential pipeline: ingestion runs
//! chunk → embed → store, queries run embed → search. A chunking or
//! embedding failure aborts the whole ingest with nothing persisted; an
//! empty batch is a no-op success.

use tracing::{debug, info};

use crate::chunking::TextChunker;
use crate::embeddings::Embedder;
use crate::store::{CollectionStats, SearchHit, SqliteVectorStore};
use crate::types::{Document, VaultError};

/// Coordinator over one chunker, one embedder, and one vector collection.
#[derive(Clone)]
pub struct VaultService {
    chunker: TextChunker,
    embedder: Embedder,
    store: SqliteVectorStore,
}

impl VaultService {
    pub fn new(chunker: TextChunker, embedder: Embedder, store: SqliteVectorStore) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    pub fn store(&self) -> &SqliteVectorStore {
        &self.store
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Ingest a batch of documents, returning the number of points stored.
    ///
    /// Documents producing zero chunks (empty batch, whitespace-only
    /// content) short-circuit to a count of 0 without touching the embedder
    /// or the store.
    pub async fn ingest(&self, documents: &[Document]) -> Result<usize, VaultError> {
        let chunks = self.chunker.chunk_documents(documents);
        if chunks.is_empty() {
            debug!(documents = documents.len(), "nothing to ingest");
            return Ok(0);
        }

        let chunk_count = chunks.len();
        let embedded = self.embedder.embed_chunks(chunks).await?;
        let written = self.store.upsert(embedded).await?;
        info!(
            documents = documents.len(),
            chunks = chunk_count,
            written,
            "ingest complete"
        );
        Ok(written)
    }

    /// Embed a query string and rank stored chunks against it. Results are
    /// returned verbatim: no re-ranking, no dedup by source.
    pub async fn query(
        &self,
        text: &str,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>, VaultError> {
        let vector = self.embedder.embed_one(text).await?;
        self.store.search(&vector, limit, score_threshold).await
    }

    /// Read-only collection snapshot.
    pub async fn stats(&self) -> Result<CollectionStats, VaultError> {
        self.store.stats().await
    }

    /// Destructively empty the collection, leaving it ready for reuse.
    pub async fn clear(&self) -> Result<(), VaultError> {
        self.store.clear().await
    }

    /// Release the storage handle.
    pub async fn shutdown(self) -> Result<(), VaultError> {
        self.store.close().await
    }
}
