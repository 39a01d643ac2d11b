//! Retrieval core of the loan product assistant.
//!
//! This crate provides:
//! - Recursive character chunking of crawled loan-product pages
//! - A persisted, brute-force cosine-similarity vector index
//! - Top-k retrieval over that index
//! - Answer assembly with a fixed fallback when nothing is retrieved
//!
//! The batch steps (normalize, build) are driven by [`RagPipeline`]; serving
//! wraps a [`Retriever`] in an [`AnswerAssembler`].
//!
//! # Features
//!
//! - `openai` (default): [`openai::OpenAIEmbeddingProvider`] and
//!   [`openai::OpenAIChatProvider`] over the OpenAI REST API.

pub mod assembler;
pub mod chunking;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod hashing;
pub mod index;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use assembler::{Answer, AnswerAssembler};
pub use chunking::RecursiveChunker;
pub use config::{DataPaths, RagConfig, RagConfigBuilder};
pub use document::{Chunk, RawDocument, RetrievalResult, ScoredChunk};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use hashing::HashingEmbeddingProvider;
pub use index::{IndexEntry, IndexManifest, VectorIndex};
pub use pipeline::{NormalizeReport, RagPipeline, RagPipelineBuilder, normalize_corpus};
pub use prompt::FALLBACK_ANSWER;
pub use retriever::Retriever;
