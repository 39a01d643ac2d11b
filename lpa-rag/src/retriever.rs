//! Query-time retrieval: embed the question, search the index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Default number of chunks returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Top-k similarity search over a loaded [`VectorIndex`].
///
/// The index is shared read-only, so one `Retriever` (or many, cloned) can
/// serve concurrent queries without locking. The provider must be the one the
/// index was built with; [`VectorIndex::load`] enforces this by model id.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    min_score: Option<f32>,
}

impl Retriever {
    /// Create a retriever over `index` that embeds queries with `embedding_provider`.
    pub fn new(index: Arc<VectorIndex>, embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedding_provider, min_score: None }
    }

    /// Drop hits scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Return a reference to the underlying index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Retrieve the `k` chunks most similar to `query`, best first.
    ///
    /// An empty index yields an empty result without calling the embedding
    /// provider. Fewer than `k` chunks in the index yields all of them.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingProvider`](crate::RagError::EmbeddingProvider)
    /// if the query cannot be embedded, or
    /// [`RagError::EmbeddingModelMismatch`](crate::RagError::EmbeddingModelMismatch)
    /// if the query vector does not fit the index.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if self.index.is_empty() || k == 0 {
            debug!(k, index_len = self.index.len(), "retrieval skipped, nothing to search");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let mut hits = self.index.search(&query_embedding, k)?;
        if let Some(threshold) = self.min_score {
            hits.retain(|hit| hit.score >= threshold);
        }

        debug!(k, hit_count = hits.len(), "retrieval completed");
        Ok(hits)
    }
}
