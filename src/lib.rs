//! Document chunking, embedding, and vector retrieval.
//!
//! ```text
//! files / directories ──► loader ──► Document
//!
//! Document ──► chunking::TextChunker ──► Chunk (bounded, overlapping)
//!                                          │
//!                    embeddings::Embedder ─┤ (batched, fixed dimension)
//!                                          ▼
//!                       store::SqliteVectorStore (sqlite-vec collection)
//!                                          │
//! query text ──► embed_one ──► search ─────┴──► ranked SearchHit
//! ```
//!
//! The [`pipeline::VaultService`] coordinator drives both directions:
//! ingestion flows one way (documents → chunks → vectors → stored points),
//! querying flows the other (text → vector → ranked hits). The only
//! long-lived shared resource is the store's SQLite handle.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod loader;
pub mod pipeline;
pub mod store;
pub mod types;

pub use chunking::{Chunk, TextChunker};
pub use config::VaultConfig;
pub use embeddings::{Embedder, EmbeddingProvider, MockEmbeddingProvider, OllamaEmbeddingProvider};
pub use loader::DocumentLoader;
pub use pipeline::VaultService;
pub use store::{CollectionStats, DistanceMetric, SearchHit, SqliteVectorStore};
pub use types::{Document, MetaValue, Metadata, VaultError};
