use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "lpa", version, about = "Loan product assistant: index builder and answer server")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Data root holding raw/, processed/ and index/
    #[arg(long, env = "LPA_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Embedding backend used for both building and querying
    #[arg(
        long,
        env = "LPA_EMBEDDER",
        value_enum,
        default_value_t = Embedder::Openai,
        global = true
    )]
    pub embedder: Embedder,

    /// OpenAI embedding model
    #[arg(long, env = "LPA_EMBEDDING_MODEL", global = true)]
    pub embedding_model: Option<String>,

    /// Native dimensions of the embedding model
    #[arg(long, env = "LPA_EMBEDDING_DIMENSIONS", default_value_t = 1536, global = true)]
    pub embedding_dimensions: usize,

    /// Buckets for the hashing embedder
    #[arg(long, default_value_t = 256, global = true)]
    pub hashing_dimensions: usize,

    /// Chunks retrieved per question
    #[arg(long, env = "LPA_TOP_K", default_value_t = 3, global = true)]
    pub top_k: usize,

    /// Drop retrieved chunks scoring below this similarity
    #[arg(long, env = "LPA_MIN_SCORE", global = true)]
    pub min_score: Option<f32>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Embedder {
    /// OpenAI embeddings API
    Openai,
    /// Offline feature hashing
    Hashing,
}

#[derive(Subcommand)]
pub enum Command {
    /// Split raw documents into chunk files
    Normalize,
    /// Embed chunk files into the persisted index
    Build,
    /// Normalize, then build
    Rebuild,
    /// Answer one question from the persisted index
    Ask {
        question: String,

        #[command(flatten)]
        chat: ChatArgs,
    },
    /// Serve POST /ask over HTTP
    Serve {
        #[arg(long, env = "LPA_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "LPA_PORT", default_value_t = 8080)]
        port: u16,

        #[command(flatten)]
        chat: ChatArgs,
    },
}

#[derive(Args)]
pub struct ChatArgs {
    /// OpenAI chat model used to generate answers
    #[arg(long, env = "LPA_CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,
}
