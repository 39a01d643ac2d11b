//! Generation provider trait: prompt in, text out.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a fully rendered prompt into an answer.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a plain-text completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}
