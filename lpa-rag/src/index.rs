//! Persisted vector index with exact cosine-similarity search.
//!
//! A [`VectorIndex`] is built once from the full chunk set, written to disk as
//! a single JSON document, and loaded wholesale by every serving session.
//! There is no upsert: a rebuild replaces the file atomically (write to a
//! sibling temp file, then rename), so readers see either the old index or
//! the new one.
//!
//! Search is brute force over all entries. Ties are broken by insertion order
//! so identical inputs always rank identically.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::document::{Chunk, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Version of the on-disk layout. Bumped on incompatible changes.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Metadata key holding the parent document id.
pub const SOURCE_KEY: &str = "source";

/// Header describing how an index was built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// On-disk layout version.
    pub format_version: u32,
    /// Identifier of the embedding model every vector came from.
    pub embedding_model: String,
    /// Length of every vector in the index.
    pub dimensions: usize,
    /// Number of entries, checked against the entry list on load.
    pub entry_count: usize,
    /// When the build finished.
    pub built_at: DateTime<Utc>,
}

/// One chunk with its embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
    /// Key-value metadata; always contains [`SOURCE_KEY`].
    pub metadata: BTreeMap<String, String>,
}

impl IndexEntry {
    /// Pair a chunk with its embedding, recording the chunk's document as its source.
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        let metadata = BTreeMap::from([(SOURCE_KEY.to_string(), chunk.document_id.clone())]);
        Self { chunk, embedding, metadata }
    }

    fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map_or(self.chunk.document_id.as_str(), String::as_str)
    }
}

/// An immutable, searchable collection of embedded chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and assemble an index in chunk order.
    ///
    /// Chunks are sent to the provider `batch_size` at a time. An empty chunk
    /// list produces an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingProvider`] if any provider call fails,
    /// returns the wrong number of vectors, or returns a vector whose length
    /// differs from [`EmbeddingProvider::dimensions`] or that holds NaN or
    /// infinite components. No partial index is returned.
    pub async fn build(
        chunks: &[Chunk],
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        let model = provider.model_id().to_string();
        let dimensions = provider.dimensions();
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = provider.embed_batch(&texts).await.map_err(|e| {
                error!(
                    model = %model,
                    batch_size = texts.len(),
                    error = %e,
                    "embedding failed during index build"
                );
                match e {
                    RagError::EmbeddingProvider { .. } => e,
                    other => RagError::EmbeddingProvider {
                        provider: model.clone(),
                        message: other.to_string(),
                    },
                }
            })?;

            if vectors.len() != batch.len() {
                return Err(RagError::EmbeddingProvider {
                    provider: model,
                    message: format!(
                        "returned {} vectors for {} texts",
                        vectors.len(),
                        batch.len()
                    ),
                });
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                if embedding.len() != dimensions {
                    return Err(RagError::EmbeddingProvider {
                        provider: model,
                        message: format!(
                            "chunk '{chunk}' embedded to {} dimensions, expected {dimensions}",
                            embedding.len()
                        ),
                    });
                }
                if embedding.iter().any(|x| !x.is_finite()) {
                    return Err(RagError::EmbeddingProvider {
                        provider: model,
                        message: format!("chunk '{chunk}' embedded to a non-finite vector"),
                    });
                }
                entries.push(IndexEntry::new(chunk.clone(), embedding));
            }
        }

        info!(model = %model, dimensions, entry_count = entries.len(), "built vector index");
        Self::from_entries(model, dimensions, entries)
    }

    /// Assemble an index from already embedded entries.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any entry's vector length differs from `dimensions`.
    pub fn from_entries(
        embedding_model: impl Into<String>,
        dimensions: usize,
        entries: Vec<IndexEntry>,
    ) -> Result<Self> {
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::Config(format!(
                "entry '{}' has {} dimensions, index has {dimensions}",
                bad.chunk,
                bad.embedding.len()
            )));
        }
        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimensions,
            entry_count: entries.len(),
            built_at: Utc::now(),
        };
        Ok(Self { manifest, entries })
    }

    /// The build manifest.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Returns fewer than `k` results when the index is smaller, and an empty
    /// result when the index is empty or `k` is zero. Non-finite scores rank
    /// as `f32::NEG_INFINITY`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingModelMismatch`] if the query vector's
    /// length differs from the index dimensions.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.manifest.dimensions {
            return Err(RagError::EmbeddingModelMismatch {
                expected: format!("{} dimensions", query.len()),
                found: format!("{} dimensions", self.manifest.dimensions),
            });
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let score = cosine_similarity(query, query_norm, &entry.embedding);
                (position, if score.is_finite() { score } else { f32::NEG_INFINITY })
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let entry = &self.entries[position];
                ScoredChunk {
                    chunk: entry.chunk.clone(),
                    score,
                    source: entry.source().to_string(),
                }
            })
            .collect())
    }

    /// Write the index to `path`, replacing any previous file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the directory, temp file, or rename fails.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
        }
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec(self).map_err(|e| RagError::io(path, e))?;

        write_synced(&tmp, &bytes).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            RagError::io(&tmp, e)
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            error!(
                tmp = %tmp.display(),
                dest = %path.display(),
                error = %e,
                "failed to finalize index write"
            );
            RagError::io(path, e)
        })?;

        info!(path = %path.display(), entry_count = self.len(), "persisted vector index");
        Ok(())
    }

    /// Read an index from `path` and check it was built with `expected_model`.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexUnavailable`] if the file is missing, cannot be
    ///   decoded, has an unsupported format version, or is internally
    ///   inconsistent.
    /// - [`RagError::EmbeddingModelMismatch`] if the recorded model differs.
    pub fn load(path: &Path, expected_model: &str) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RagError::index_unavailable(path, "index file not found; run the build step")
            } else {
                RagError::index_unavailable(path, format!("failed to read index: {e}"))
            }
        })?;

        let index: Self = serde_json::from_slice(&bytes).map_err(|e| {
            RagError::index_unavailable(path, format!("failed to decode index: {e}"))
        })?;
        index.validate().map_err(|message| RagError::index_unavailable(path, message))?;

        if index.manifest.embedding_model != expected_model {
            return Err(RagError::EmbeddingModelMismatch {
                expected: expected_model.to_string(),
                found: index.manifest.embedding_model.clone(),
            });
        }

        info!(
            path = %path.display(),
            model = %index.manifest.embedding_model,
            entry_count = index.len(),
            "loaded vector index"
        );
        Ok(index)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {INDEX_FORMAT_VERSION})",
                self.manifest.format_version
            ));
        }
        if self.manifest.entry_count != self.entries.len() {
            return Err(format!(
                "manifest lists {} entries, file holds {}",
                self.manifest.entry_count,
                self.entries.len()
            ));
        }
        let dimensions = self.manifest.dimensions;
        if let Some(bad) = self.entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(format!(
                "entry '{}' has {} dimensions, manifest says {dimensions}",
                bad.chunk,
                bad.embedding.len()
            ));
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
fn cosine_similarity(query: &[f32], query_norm: f32, other: &[f32]) -> f32 {
    let other_norm = l2_norm(other);
    if query_norm == 0.0 || other_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(other).map(|(x, y)| x * y).sum();
    dot / (query_norm * other_norm)
}
