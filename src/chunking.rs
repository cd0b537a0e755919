//! Recursive character chunking for retrieval pipelines.
//!
//! Splits document text on an ordered separator hierarchy (paragraphs, then
//! lines, then words, then single characters) and reassembles the pieces into
//! chunks bounded by a character budget, carrying a configurable overlap from
//! each chunk into the next. Whole semantic units are preserved whenever they
//! fit; mid-word splitting only happens when no separator produces a
//! small-enough piece.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::types::{Document, Metadata, MetaValue, VaultError};

/// Default separator hierarchy, coarsest to finest. The trailing empty
/// separator guarantees a hard per-character split as the last resort.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A bounded text segment derived from a document.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// Segment text, at most `chunk_size` characters.
    pub text: String,
    /// Zero-based position of this chunk within its document.
    pub chunk_index: usize,
    /// Character length of `text`.
    pub chunk_size: usize,
    /// Number of chunks produced from the same document.
    pub total_chunks: usize,
    /// Source metadata plus any caller-supplied entries.
    pub metadata: Metadata,
    /// Embedding vector, attached after chunking by the embedder.
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(text: impl Into<String>, chunk_index: usize, total_chunks: usize) -> Self {
        let text = text.into();
        let chunk_size = text.chars().count();
        Self {
            text,
            chunk_index,
            chunk_size,
            total_chunks,
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    /// Replace the chunk metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach an embedding vector.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Full payload persisted with this chunk's vector: positional fields,
    /// the text, and the source metadata. The embedding is not part of it.
    pub fn payload(&self) -> Metadata {
        let mut payload = self.metadata.clone();
        payload.insert("text".to_string(), MetaValue::from(self.text.clone()));
        payload.insert("chunk_index".to_string(), MetaValue::from(self.chunk_index));
        payload.insert("chunk_size".to_string(), MetaValue::from(self.chunk_size));
        payload.insert(
            "total_chunks".to_string(),
            MetaValue::from(self.total_chunks),
        );
        payload
    }
}

/// Splits text into bounded, overlapping chunks.
///
/// Lengths are measured in characters, not bytes, so multi-byte input never
/// splits inside a code point.
#[derive(Clone, Debug)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a chunker with the default separator hierarchy.
    ///
    /// `chunk_size` must be positive and `chunk_overlap` strictly smaller
    /// than it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, VaultError> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Create a chunker with a custom separator hierarchy, coarsest first.
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, VaultError> {
        if chunk_size == 0 {
            return Err(VaultError::Chunking(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(VaultError::Chunking(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        if separators.is_empty() {
            return Err(VaultError::Chunking(
                "at least one separator is required".to_string(),
            ));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks, merging `metadata` into each one verbatim.
    ///
    /// Empty or whitespace-only input yields zero chunks. Input that already
    /// fits the budget yields exactly one chunk with the text unmodified.
    pub fn chunk_text(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        if text.trim().is_empty() {
            warn!("empty text provided for chunking");
            return Vec::new();
        }

        let pieces = if char_len(text) <= self.chunk_size {
            vec![text.to_string()]
        } else {
            self.split_text(text, &self.separators)
        };

        let total_chunks = pieces.len();
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, piece)| {
                Chunk::new(piece, chunk_index, total_chunks).with_metadata(metadata.clone())
            })
            .collect();

        debug!(
            chunks = chunks.len(),
            chars = char_len(text),
            "chunked text"
        );
        chunks
    }

    /// Chunk a batch of documents, extending each chunk's metadata with the
    /// owning document's fields (everything except content). Output order is
    /// document order, then chunk order.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all_chunks = Vec::new();
        for document in documents {
            let metadata = document.metadata();
            all_chunks.extend(self.chunk_text(&document.content, &metadata));
        }
        debug!(
            documents = documents.len(),
            chunks = all_chunks.len(),
            "chunked document batch"
        );
        all_chunks
    }

    /// Recursive separator splitting. Pieces still over budget after a split
    /// are re-split with the remaining, finer separators.
    fn split_text(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators
            .last()
            .cloned()
            .unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = String::new();
                remaining = &[];
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.clone();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_on_separator(text, &separator);

        let mut final_chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.chunk_size {
                good.push(piece);
            } else {
                if !good.is_empty() {
                    final_chunks.extend(self.merge_splits(std::mem::take(&mut good), &separator));
                }
                if remaining.is_empty() {
                    // No finer separator left; the oversized piece passes
                    // through as-is.
                    final_chunks.push(piece);
                } else {
                    final_chunks.extend(self.split_text(&piece, remaining));
                }
            }
        }
        if !good.is_empty() {
            final_chunks.extend(self.merge_splits(good, &separator));
        }
        final_chunks
    }

    /// Reassemble small splits into chunks up to `chunk_size`, retaining a
    /// tail of up to `chunk_overlap` characters worth of splits as the start
    /// of the next chunk.
    fn merge_splits(&self, splits: Vec<String>, separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs: Vec<String> = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let piece_len = char_len(&piece);
            let join_len = if current.is_empty() { 0 } else { separator_len };
            if total + piece_len + join_len > self.chunk_size && !current.is_empty() {
                if let Some(doc) = join_pieces(&current, separator) {
                    docs.push(doc);
                }
                // Drop leading splits until the retained tail fits both the
                // overlap budget and, together with the next piece, the
                // chunk budget.
                while total > self.chunk_overlap
                    || (total > 0
                        && total
                            + piece_len
                            + if current.is_empty() { 0 } else { separator_len }
                            > self.chunk_size)
                {
                    let removed = current
                        .pop_front()
                        .expect("total is positive only while pieces remain");
                    total -= char_len(&removed)
                        + if current.is_empty() { 0 } else { separator_len };
                }
            }
            total += piece_len + if current.is_empty() { 0 } else { separator_len };
            current.push_back(piece);
        }

        if let Some(doc) = join_pieces(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Join retained pieces with the separator and trim edges; whitespace-only
/// results are dropped.
fn join_pieces(pieces: &VecDeque<String>, separator: &str) -> Option<String> {
    let joined = pieces
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split on a separator, dropping empty fragments. The empty separator
/// splits into single characters.
fn split_on_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }
}
