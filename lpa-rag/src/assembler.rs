//! Answer assembly: retrieval, the no-context short circuit, and generation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Result;
use crate::generation::GenerationProvider;
use crate::prompt::{FALLBACK_ANSWER, build_context, render_prompt};
use crate::retriever::Retriever;

/// Outcome of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// The generator answered from retrieved context.
    Grounded {
        /// The generated answer.
        text: String,
        /// Ids of the chunks used as context, in rank order.
        sources: Vec<String>,
    },
    /// Retrieval found nothing; the generator was not called.
    NoRelevantContext,
}

impl Answer {
    /// The text to show the caller.
    pub fn text(&self) -> &str {
        match self {
            Self::Grounded { text, .. } => text,
            Self::NoRelevantContext => FALLBACK_ANSWER,
        }
    }

    /// Consume the answer, returning the text to show the caller.
    pub fn into_text(self) -> String {
        match self {
            Self::Grounded { text, .. } => text,
            Self::NoRelevantContext => FALLBACK_ANSWER.to_string(),
        }
    }

    /// Whether the answer came from retrieved context.
    pub fn is_grounded(&self) -> bool {
        matches!(self, Self::Grounded { .. })
    }
}

/// Turns a question into an [`Answer`] using a [`Retriever`] and a [`GenerationProvider`].
///
/// # Example
///
/// ```rust,ignore
/// let assembler = AnswerAssembler::new(retriever, Arc::new(generator), 3);
/// let answer = assembler.answer("What is the home loan interest rate?").await?;
/// println!("{}", answer.text());
/// ```
#[derive(Clone)]
pub struct AnswerAssembler {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl AnswerAssembler {
    /// Create an assembler that retrieves `top_k` chunks per question.
    pub fn new(retriever: Retriever, generator: Arc<dyn GenerationProvider>, top_k: usize) -> Self {
        Self { retriever, generator, top_k }
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question`.
    ///
    /// With no retrieved chunks this returns [`Answer::NoRelevantContext`]
    /// without calling the generator. Otherwise the chunk texts are joined in
    /// rank order with `"\n---\n"`, rendered into the prompt, and sent to the
    /// generator.
    ///
    /// # Errors
    ///
    /// Propagates retrieval errors and [`RagError::Generation`](crate::RagError::Generation).
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let hits = self.retriever.retrieve(question, self.top_k).await?;
        if hits.is_empty() {
            info!("no relevant context retrieved, returning fallback answer");
            return Ok(Answer::NoRelevantContext);
        }

        let context = build_context(hits.iter().map(|hit| hit.chunk.text.as_str()));
        let prompt = render_prompt(&context, question);
        let text = self.generator.generate(&prompt).await.map_err(|e| {
            error!(generator = self.generator.name(), error = %e, "generation failed");
            e
        })?;

        let sources = hits.iter().map(|hit| hit.chunk.id()).collect::<Vec<_>>();
        info!(generator = self.generator.name(), source_count = sources.len(), "answered question");
        Ok(Answer::Grounded { text, sources })
    }
}
