//! The seam between chunk text and the vectors stored in the index.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-length vectors for indexing and querying.
///
/// Implementations wrap specific embedding backends (OpenAI, the offline
/// hashing embedder, ...) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Every vector returned by one provider has [`dimensions`](EmbeddingProvider::dimensions)
/// entries. [`model_id`](EmbeddingProvider::model_id) is recorded in the
/// persisted index and compared on load, so two providers that produce
/// incompatible vectors must report different identifiers.
///
/// # Example
///
/// ```rust,ignore
/// use lpa_rag::{EmbeddingProvider, HashingEmbeddingProvider};
///
/// let provider = HashingEmbeddingProvider::default();
/// let embedding = provider.embed("home loan interest rate").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Identifier of the embedding model, stored alongside the index.
    fn model_id(&self) -> &str;
}
