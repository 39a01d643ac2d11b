//! Data types for documents, chunks, and retrieval results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw source document as written by the crawler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawDocument {
    /// Identifier derived from the source file name.
    pub id: String,
    /// The full text body.
    pub text: String,
}

impl RawDocument {
    /// Create a document from an identifier and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// A trimmed, bounded-size segment of a [`RawDocument`].
///
/// Identity is `(document_id, index)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The ID of the parent [`RawDocument`].
    pub document_id: String,
    /// Position of this chunk within its parent, starting at 0.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
}

impl Chunk {
    /// Create a chunk.
    pub fn new(document_id: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self { document_id: document_id.into(), index, text: text.into() }
    }

    /// Stable string form of the chunk identity, also used as its file stem.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_chunk{}", self.document_id, self.index)
    }
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
    /// Provenance recorded in the index metadata.
    pub source: String,
}

/// Ranked chunks for one query, most similar first.
pub type RetrievalResult = Vec<ScoredChunk>;
