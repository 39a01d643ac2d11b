//! Offline feature-hashing embedder.
//!
//! [`HashingEmbeddingProvider`] maps each lowercase alphanumeric token to a
//! bucket chosen by SHA-256 and counts occurrences, then L2-normalizes the
//! result. It needs no network access and is fully deterministic, which
//! makes it the embedder of choice for tests and air-gapped builds. Quality
//! is lexical: texts sharing words score high, paraphrases do not.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default number of hash buckets.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

/// A deterministic bag-of-words [`EmbeddingProvider`].
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbeddingProvider {
    /// Create a provider with the given number of buckets.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::Config("hashing dimensions must be greater than zero".into()));
        }
        Ok(Self { dimensions, model_id: format!("hashing-sha256-{dimensions}") })
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_HASHING_DIMENSIONS,
            model_id: format!("hashing-sha256-{DEFAULT_HASHING_DIMENSIONS}"),
        }
    }
}

/// Lowercase runs of alphanumeric characters.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_lowercases_and_drops_punctuation() {
        let tokens: Vec<String> = tokenize("Interest rate is 8.5%!").collect();
        assert_eq!(tokens, vec!["interest", "rate", "is", "8", "5"]);
    }

    #[test]
    fn vectors_are_unit_length_and_deterministic() {
        let provider = HashingEmbeddingProvider::default();
        let a = provider.vectorize("Processing fee is 1%.");
        let b = provider.vectorize("processing FEE is 1");
        assert_eq!(a, b);
        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let provider = HashingEmbeddingProvider::new(8).unwrap();
        assert_eq!(provider.vectorize("  ... "), vec![0.0; 8]);
        assert_eq!(provider.model_id(), "hashing-sha256-8");
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(HashingEmbeddingProvider::new(0), Err(RagError::Config(_))));
    }
}
