//! Shared server state with a lazily loaded answer assembler.

use std::sync::Arc;

use lpa_rag::{AnswerAssembler, GenerationProvider, RagError, RagPipeline, Result};
use tokio::sync::RwLock;
use tracing::{error, info};

/// State shared by every request handler.
///
/// The index is loaded on the first request that needs it. A failed load is
/// not cached, so requests keep failing with `IndexUnavailable` until a
/// rebuild lands and the next request picks it up.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RagPipeline>,
    generator: Arc<dyn GenerationProvider>,
    assembler: Arc<RwLock<Option<AnswerAssembler>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>, generator: Arc<dyn GenerationProvider>) -> Self {
        Self { pipeline, generator, assembler: Arc::new(RwLock::new(None)) }
    }

    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Return the loaded assembler, loading the index first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] or
    /// [`RagError::EmbeddingModelMismatch`] when the index cannot be used.
    pub async fn assembler(&self) -> Result<AnswerAssembler> {
        if let Some(assembler) = self.assembler.read().await.as_ref() {
            return Ok(assembler.clone());
        }

        let mut slot = self.assembler.write().await;
        if let Some(assembler) = slot.as_ref() {
            return Ok(assembler.clone());
        }

        let pipeline = self.pipeline.clone();
        let retriever = tokio::task::spawn_blocking(move || pipeline.retriever())
            .await
            .map_err(|e| RagError::IndexUnavailable {
                path: self.pipeline.paths().index_file().display().to_string(),
                message: format!("index load task failed: {e}"),
            })?
            .map_err(|e| {
                error!(error = %e, "failed to load index");
                e
            })?;

        info!(entry_count = retriever.index().len(), "index loaded for serving");
        let assembler =
            AnswerAssembler::new(retriever, self.generator.clone(), self.pipeline.config().top_k);
        *slot = Some(assembler.clone());
        Ok(assembler)
    }
}
