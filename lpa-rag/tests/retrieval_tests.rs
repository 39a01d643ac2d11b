//! Top-k retrieval over an in-memory index.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lpa_rag::{
    Chunk, EmbeddingProvider, HashingEmbeddingProvider, RagError, Result, Retriever, VectorIndex,
};

/// Counts embed calls made through it.
struct CountingProvider {
    inner: HashingEmbeddingProvider,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Self {
        Self { inner: HashingEmbeddingProvider::default(), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

struct OfflineProvider;

#[async_trait]
impl EmbeddingProvider for OfflineProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingProvider {
            provider: "offline".into(),
            message: "connection refused".into(),
        })
    }

    fn dimensions(&self) -> usize {
        256
    }

    fn model_id(&self) -> &str {
        "hashing-sha256-256"
    }
}

async fn retriever_over(chunks: &[Chunk]) -> (Retriever, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::new());
    let index = VectorIndex::build(chunks, provider.as_ref(), 64).await.unwrap();
    provider.calls.store(0, Ordering::SeqCst);
    (Retriever::new(Arc::new(index), provider.clone()), provider)
}

fn loan_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("home-loan", 0, "Loan tenure is 5 years."),
        Chunk::new("home-loan", 1, "Interest rate is 8.5%."),
        Chunk::new("fees", 0, "Processing fee is 1%."),
    ]
}

#[tokio::test]
async fn interest_rate_question_finds_the_rate_chunk() {
    let (retriever, _) = retriever_over(&loan_chunks()).await;

    let hits = retriever.retrieve("What is the interest rate?", 1).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.text, "Interest rate is 8.5%.");
    assert!((hits[0].score - 0.6).abs() < 1e-5);
    assert_eq!(hits[0].source, "home-loan");
}

#[tokio::test]
async fn results_are_ranked_best_first() {
    let (retriever, _) = retriever_over(&loan_chunks()).await;

    let hits = retriever.retrieve("What is the interest rate?", 3).await.unwrap();
    let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();

    assert_eq!(
        texts,
        vec!["Interest rate is 8.5%.", "Processing fee is 1%.", "Loan tenure is 5 years."]
    );
    assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn k_larger_than_the_index_returns_everything() {
    let chunks = &loan_chunks()[..2];
    let (retriever, _) = retriever_over(chunks).await;

    let hits = retriever.retrieve("loan", 3).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn empty_index_returns_nothing_without_embedding() {
    let (retriever, provider) = retriever_over(&[]).await;

    let hits = retriever.retrieve("What is the interest rate?", 3).await.unwrap();

    assert!(hits.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn min_score_filters_weak_hits() {
    let (retriever, _) = retriever_over(&loan_chunks()).await;
    let retriever = retriever.with_min_score(Some(0.5));

    let hits = retriever.retrieve("What is the interest rate?", 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.id(), "home-loan_chunk1");

    let hits = retriever.retrieve("documents required for gold loans", 3).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn embedding_failure_surfaces_as_provider_error() {
    let index = VectorIndex::build(&loan_chunks(), &HashingEmbeddingProvider::default(), 64)
        .await
        .unwrap();
    let retriever = Retriever::new(Arc::new(index), Arc::new(OfflineProvider));

    let err = retriever.retrieve("interest", 3).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingProvider { .. }));
}

#[tokio::test]
async fn concurrent_queries_share_one_index() {
    let (retriever, _) = retriever_over(&loan_chunks()).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let retriever = retriever.clone();
            tokio::spawn(async move { retriever.retrieve("processing fee", 1).await })
        })
        .collect();

    for handle in handles {
        let hits = handle.await.unwrap().unwrap();
        assert_eq!(hits[0].chunk.text, "Processing fee is 1%.");
    }
}
