//! Offline pipeline orchestrator.
//!
//! The [`RagPipeline`] runs the batch steps against a [`DataPaths`] layout:
//! normalize raw documents into chunk files, then embed the chunk files into
//! a persisted [`VectorIndex`]. It also loads that index back for serving.
//!
//! # Example
//!
//! ```rust,ignore
//! use lpa_rag::{DataPaths, HashingEmbeddingProvider, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .paths(DataPaths::from_root("data"))
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .build()?;
//!
//! pipeline.normalize()?;
//! pipeline.build_index().await?;
//! let retriever = pipeline.retriever()?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::RecursiveChunker;
use crate::config::{DataPaths, RagConfig};
use crate::corpus::{read_chunks, read_raw_documents, write_chunks};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::retriever::Retriever;

/// Counts from one normalize run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Documents decoded successfully.
    pub documents_read: usize,
    /// Documents skipped because they could not be read or decoded.
    pub documents_invalid: usize,
    /// Documents dropped for being shorter than the minimum length.
    pub documents_too_short: usize,
    /// Chunk files written.
    pub chunks_written: usize,
}

/// The batch pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    paths: DataPaths,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: RecursiveChunker,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the data layout.
    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Normalize every raw document into chunk files.
    ///
    /// See [`normalize_corpus`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the raw directory cannot be listed or the
    /// chunk files cannot be written.
    pub fn normalize(&self) -> Result<NormalizeReport> {
        normalize_with(&self.chunker, &self.paths)
    }

    /// Embed all chunk files and persist the resulting index.
    ///
    /// The previous index stays in place unless every chunk embeds
    /// successfully.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingProvider`] on any embedding failure and
    /// [`RagError::Io`] if chunks cannot be read or the index cannot be written.
    pub async fn build_index(&self) -> Result<VectorIndex> {
        let chunks = read_chunks(&self.paths.processed_dir)?;
        let index = VectorIndex::build(
            &chunks,
            self.embedding_provider.as_ref(),
            self.config.embed_batch_size,
        )
        .await
        .map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "index build aborted");
            e
        })?;
        index.persist(&self.paths.index_file())?;
        Ok(index)
    }

    /// Normalize then build, as one batch rebuild.
    ///
    /// # Errors
    ///
    /// See [`normalize`](Self::normalize) and [`build_index`](Self::build_index).
    pub async fn rebuild(&self) -> Result<(NormalizeReport, VectorIndex)> {
        let report = self.normalize()?;
        let index = self.build_index().await?;
        Ok((report, index))
    }

    /// Load the persisted index, checking it matches the embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] or [`RagError::EmbeddingModelMismatch`].
    pub fn load_index(&self) -> Result<VectorIndex> {
        VectorIndex::load(&self.paths.index_file(), self.embedding_provider.model_id())
    }

    /// Load the persisted index and wrap it in a [`Retriever`].
    ///
    /// # Errors
    ///
    /// See [`load_index`](Self::load_index).
    pub fn retriever(&self) -> Result<Retriever> {
        let index = self.load_index()?;
        Ok(Retriever::new(Arc::new(index), self.embedding_provider.clone())
            .with_min_score(self.config.min_score))
    }
}

/// Normalize every raw document under `paths.raw_dir` into chunk files.
///
/// Needs no embedding provider. Invalid documents are skipped and the
/// previous chunk set is replaced only once the new one is fully written.
///
/// # Errors
///
/// Returns [`RagError::Config`] for an inconsistent `config`, and
/// [`RagError::Io`] if the raw directory cannot be listed or the chunk files
/// cannot be written.
pub fn normalize_corpus(config: &RagConfig, paths: &DataPaths) -> Result<NormalizeReport> {
    config.validate()?;
    normalize_with(&RecursiveChunker::from_config(config), paths)
}

fn normalize_with(chunker: &RecursiveChunker, paths: &DataPaths) -> Result<NormalizeReport> {
    let corpus = read_raw_documents(&paths.raw_dir)?;
    let mut report = NormalizeReport {
        documents_read: corpus.documents.len(),
        documents_invalid: corpus.invalid.len(),
        ..NormalizeReport::default()
    };

    let mut chunks = Vec::new();
    for document in &corpus.documents {
        let document_chunks = chunker.normalize(document);
        if document_chunks.is_empty() {
            report.documents_too_short += 1;
        }
        chunks.extend(document_chunks);
    }

    report.chunks_written = write_chunks(&paths.processed_dir, &chunks)?;
    info!(
        documents_read = report.documents_read,
        documents_invalid = report.documents_invalid,
        documents_too_short = report.documents_too_short,
        chunk_count = report.chunks_written,
        processed_dir = %paths.processed_dir.display(),
        "normalized corpus"
    );
    Ok(report)
}

/// Builder for constructing a [`RagPipeline`].
///
/// `paths` and `embedding_provider` are required; `config` defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    paths: Option<DataPaths>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the data layout.
    pub fn paths(mut self, paths: DataPaths) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let paths = self.paths.ok_or_else(|| RagError::Config("paths are required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;

        let chunker = RecursiveChunker::from_config(&config);
        Ok(RagPipeline { config, paths, embedding_provider, chunker })
    }
}
