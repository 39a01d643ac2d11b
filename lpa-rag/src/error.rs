//! Error types for the `lpa-rag` crate.

use thiserror::Error;

/// Errors that can occur while normalizing, indexing, or answering.
///
/// An empty retrieval is not an error; it surfaces as
/// [`Answer::NoRelevantContext`](crate::assembler::Answer).
#[derive(Debug, Error)]
pub enum RagError {
    /// A raw document could not be read or decoded. Callers skip it.
    #[error("Invalid document '{id}': {message}")]
    InvalidDocument {
        /// Identifier of the offending document.
        id: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding provider failed or returned unusable vectors.
    #[error("Embedding provider error ({provider}): {message}")]
    EmbeddingProvider {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The persisted index is missing, unreadable, or corrupt.
    #[error("Index unavailable at {path}: {message}")]
    IndexUnavailable {
        /// Location of the persisted index.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The index was built with a different embedding model than the one in use.
    #[error("Embedding model mismatch: index uses '{found}', provider uses '{expected}'")]
    EmbeddingModelMismatch {
        /// What the provider in use produces.
        expected: String,
        /// What the index was built with.
        found: String,
    },

    /// The generation provider failed.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A filesystem operation failed outside of index loading.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// The path involved.
        path: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io { path: path.display().to_string(), message: err.to_string() }
    }

    pub(crate) fn index_unavailable(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::IndexUnavailable { path: path.display().to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
