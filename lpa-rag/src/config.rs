//! Configuration for normalization, indexing, and retrieval.
//!
//! Nothing in this crate computes paths on its own: every component receives
//! a [`RagConfig`] and, where it touches the filesystem, a [`DataPaths`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// File name of the persisted index inside [`DataPaths::index_dir`].
pub const INDEX_FILE_NAME: &str = "index.json";

/// Tuning parameters shared by the normalizer, index builder, and retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Documents shorter than this (after trimming) produce no chunks.
    pub min_document_chars: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    /// Number of chunk texts sent to the embedding provider per call.
    pub embed_batch_size: usize,
    /// Hits scoring below this are dropped. `None` keeps every hit.
    pub min_score: Option<f32>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_document_chars: 100,
            top_k: 3,
            embed_batch_size: 64,
            min_score: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embed_batch_size == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the minimum trimmed document length that yields chunks.
    pub fn min_document_chars(mut self, chars: usize) -> Self {
        self.config.min_document_chars = chars;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of texts per embedding call during index builds.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Drop retrieval hits scoring below `score`.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = Some(score);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Locations of the raw corpus, the chunk files, and the persisted index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataPaths {
    /// Directory of raw `.txt` documents produced by the crawler.
    pub raw_dir: PathBuf,
    /// Directory the normalizer writes chunk files into.
    pub processed_dir: PathBuf,
    /// Directory holding the persisted index.
    pub index_dir: PathBuf,
}

impl DataPaths {
    /// Lay out `raw/`, `processed/`, and `index/` under a single data root.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_dir: root.join("raw"),
            processed_dir: root.join("processed"),
            index_dir: root.join("index"),
        }
    }

    /// Full path of the persisted index file.
    pub fn index_file(&self) -> PathBuf {
        self.index_dir.join(INDEX_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_chunk_at_500_with_50_overlap() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.min_document_chars, 100);
        assert_eq!(config.top_k, 3);
        assert!(config.min_score.is_none());
    }

    #[test]
    fn builder_rejects_overlap_not_below_size() {
        let err = RagConfig::builder().chunk_size(50).chunk_overlap(50).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn builder_rejects_zero_top_k_and_batch() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().embed_batch_size(0).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    }

    #[test]
    fn data_paths_from_root() {
        let paths = DataPaths::from_root("/srv/lpa");
        assert_eq!(paths.raw_dir, PathBuf::from("/srv/lpa/raw"));
        assert_eq!(paths.processed_dir, PathBuf::from("/srv/lpa/processed"));
        assert_eq!(paths.index_file(), PathBuf::from("/srv/lpa/index/index.json"));
    }
}
