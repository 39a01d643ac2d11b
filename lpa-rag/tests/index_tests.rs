//! Build, persist, load, and search tests for the vector index.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lpa_rag::index::INDEX_FORMAT_VERSION;
use lpa_rag::{
    Chunk, EmbeddingProvider, HashingEmbeddingProvider, IndexEntry, RagError, Result, VectorIndex,
};
use proptest::prelude::*;

fn loan_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("home-loan", 0, "Loan tenure is 5 years."),
        Chunk::new("home-loan", 1, "Interest rate is 8.5%."),
        Chunk::new("fees", 0, "Processing fee is 1%."),
    ]
}

/// Fails every call after the first `ok_calls`.
struct FlakyProvider {
    inner: HashingEmbeddingProvider,
    ok_calls: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
            return Err(RagError::EmbeddingProvider {
                provider: "flaky".into(),
                message: "quota exceeded".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Claims more dimensions than it produces.
struct ShortVectorProvider;

#[async_trait]
impl EmbeddingProvider for ShortVectorProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn model_id(&self) -> &str {
        "short"
    }
}

struct NanProvider;

#[async_trait]
impl EmbeddingProvider for NanProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("Interest") { Ok(vec![f32::NAN, 1.0]) } else { Ok(vec![1.0, 0.0]) }
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_id(&self) -> &str {
        "nan"
    }
}

#[tokio::test]
async fn persisted_index_round_trips() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("index").join("index.json");
    let provider = HashingEmbeddingProvider::default();

    let built = VectorIndex::build(&loan_chunks(), &provider, 2).await.unwrap();
    built.persist(&path).unwrap();
    let loaded = VectorIndex::load(&path, provider.model_id()).unwrap();

    assert_eq!(loaded.manifest(), built.manifest());
    assert_eq!(loaded.manifest().format_version, INDEX_FORMAT_VERSION);
    assert_eq!(loaded.manifest().entry_count, 3);
    assert_eq!(loaded.manifest().embedding_model, "hashing-sha256-256");

    for chunk in loan_chunks() {
        let query = provider.embed(&chunk.text).await.unwrap();
        let hits = loaded.search(&query, 1).unwrap();
        assert_eq!(hits[0].chunk, chunk);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert_eq!(hits[0].source, chunk.document_id);
    }
}

#[tokio::test]
async fn persist_leaves_no_temp_file_behind() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("index.json");
    let index = VectorIndex::build(&loan_chunks(), &HashingEmbeddingProvider::default(), 64)
        .await
        .unwrap();

    index.persist(&path).unwrap();
    index.persist(&path).unwrap();

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["index.json"]);
}

#[tokio::test]
async fn load_rejects_a_different_embedding_model() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("index.json");
    let index = VectorIndex::build(&loan_chunks(), &HashingEmbeddingProvider::default(), 64)
        .await
        .unwrap();
    index.persist(&path).unwrap();

    let err = VectorIndex::load(&path, "text-embedding-3-small").unwrap_err();
    match err {
        RagError::EmbeddingModelMismatch { expected, found } => {
            assert_eq!(expected, "text-embedding-3-small");
            assert_eq!(found, "hashing-sha256-256");
        }
        other => panic!("expected model mismatch, got {other:?}"),
    }
}

#[test]
fn missing_index_is_unavailable() {
    let temp = tempfile::tempdir().unwrap();
    let err = VectorIndex::load(&temp.path().join("index.json"), "any").unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}

#[test]
fn corrupt_index_is_unavailable() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("index.json");
    fs::write(&path, b"{\"manifest\": {\"format_version\": 1").unwrap();

    let err = VectorIndex::load(&path, "any").unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}

#[tokio::test]
async fn inconsistent_manifest_is_unavailable() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("index.json");
    let provider = HashingEmbeddingProvider::default();
    let index = VectorIndex::build(&loan_chunks(), &provider, 64).await.unwrap();
    let mut value = serde_json::to_value(&index).unwrap();

    value["manifest"]["entry_count"] = serde_json::json!(7);
    fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
    let err = VectorIndex::load(&path, provider.model_id()).unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));

    value["manifest"]["entry_count"] = serde_json::json!(3);
    value["manifest"]["format_version"] = serde_json::json!(INDEX_FORMAT_VERSION + 1);
    fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
    let err = VectorIndex::load(&path, provider.model_id()).unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}

#[tokio::test]
async fn build_fails_whole_when_a_batch_fails() {
    let provider = FlakyProvider {
        inner: HashingEmbeddingProvider::default(),
        ok_calls: 2,
        calls: AtomicUsize::new(0),
    };

    let err = VectorIndex::build(&loan_chunks(), &provider, 1).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingProvider { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn build_rejects_vectors_of_the_wrong_length() {
    let err = VectorIndex::build(&loan_chunks(), &ShortVectorProvider, 64).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingProvider { .. }));
}

#[tokio::test]
async fn non_finite_embedding_fails_the_build() {
    let err = VectorIndex::build(&loan_chunks(), &NanProvider, 64).await.unwrap_err();

    match err {
        RagError::EmbeddingProvider { provider, message } => {
            assert_eq!(provider, "nan");
            assert!(message.contains("home-loan_chunk1"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_chunk_set_builds_an_empty_index() {
    let index = VectorIndex::build(&[], &HashingEmbeddingProvider::default(), 64).await.unwrap();
    assert!(index.is_empty());
    assert!(index.search(&[1.0; 256], 3).unwrap().is_empty());
}

fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
}

mod prop_search_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            embeddings in proptest::collection::vec(arb_embedding(DIM), 0..20),
            query in arb_embedding(DIM),
            k in 0usize..25,
        ) {
            let entries: Vec<IndexEntry> = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, e)| IndexEntry::new(Chunk::new("doc", i, format!("chunk {i}")), e))
                .collect();
            let count = entries.len();
            let index = VectorIndex::from_entries("test", DIM, entries).unwrap();

            let hits = index.search(&query, k).unwrap();

            prop_assert_eq!(hits.len(), k.min(count));
            for pair in hits.windows(2) {
                prop_assert!(
                    pair[0].score > pair[1].score
                        || (pair[0].score == pair[1].score
                            && pair[0].chunk.index < pair[1].chunk.index),
                    "results not ordered: {} then {}",
                    pair[0].score,
                    pair[1].score
                );
            }
            for hit in &hits {
                prop_assert!(hit.score >= -1.0 - 1e-5 && hit.score <= 1.0 + 1e-5);
            }
        }
    }
}
