//! # lpa
//!
//! Usage:
//!   lpa normalize                         # raw/*.txt -> processed/*_chunkN.txt
//!   lpa build                             # processed/ -> index/index.json
//!   lpa ask "What is the interest rate?"  # one answer on stdout
//!   lpa serve --port 8080                 # POST /ask, GET /health

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use lpa_rag::openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
use lpa_rag::{
    AnswerAssembler, DataPaths, EmbeddingProvider, GenerationProvider, HashingEmbeddingProvider,
    RagConfig, RagPipeline, normalize_corpus,
};
use lpa_server::{AppState, ServerConfig, run_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{ChatArgs, Cli, Command, Embedder, GlobalArgs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = rag_config(&cli.global)?;
    let paths = DataPaths::from_root(&cli.global.data_dir);

    match cli.cmd {
        Command::Normalize => {
            let report = normalize_corpus(&config, &paths)?;
            println!(
                "normalized {} documents into {} chunks ({} too short, {} invalid)",
                report.documents_read,
                report.chunks_written,
                report.documents_too_short,
                report.documents_invalid
            );
        }
        Command::Build => {
            let pipeline = build_pipeline(&cli.global, config, paths)?;
            let index = pipeline.build_index().await?;
            let path = pipeline.paths().index_file();
            println!("indexed {} chunks into {}", index.len(), path.display());
        }
        Command::Rebuild => {
            let pipeline = build_pipeline(&cli.global, config, paths)?;
            let (report, index) = pipeline.rebuild().await?;
            println!(
                "normalized {} documents, indexed {} chunks into {}",
                report.documents_read,
                index.len(),
                pipeline.paths().index_file().display()
            );
        }
        Command::Ask { question, chat } => {
            if question.trim().is_empty() {
                bail!("question must not be empty");
            }
            let pipeline = build_pipeline(&cli.global, config, paths)?;
            let retriever = pipeline.retriever()?;
            let generator = chat_provider(&cli.global, &chat)?;
            let assembler = AnswerAssembler::new(retriever, generator, cli.global.top_k);
            let answer = assembler.answer(question.trim()).await?;
            println!("{}", answer.text());
        }
        Command::Serve { host, port, chat } => {
            let pipeline = Arc::new(build_pipeline(&cli.global, config, paths)?);
            let state = AppState::new(pipeline, chat_provider(&cli.global, &chat)?);
            info!(data_dir = %cli.global.data_dir.display(), "starting server");
            run_server(ServerConfig { host, port }, state).await?;
        }
    }

    Ok(())
}

fn rag_config(args: &GlobalArgs) -> Result<RagConfig> {
    let mut config = RagConfig::builder().top_k(args.top_k);
    if let Some(score) = args.min_score {
        config = config.min_score(score);
    }
    config.build().context("invalid retrieval settings")
}

/// Pipeline for the commands that embed; only these need embedder credentials.
fn build_pipeline(args: &GlobalArgs, config: RagConfig, paths: DataPaths) -> Result<RagPipeline> {
    let pipeline = RagPipeline::builder()
        .config(config)
        .paths(paths)
        .embedding_provider(embedding_provider(args)?)
        .build()?;
    Ok(pipeline)
}

fn embedding_provider(args: &GlobalArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    match args.embedder {
        Embedder::Hashing => Ok(Arc::new(HashingEmbeddingProvider::new(args.hashing_dimensions)?)),
        Embedder::Openai => {
            let mut provider = OpenAIEmbeddingProvider::new(api_key(args)?)?;
            if let Some(model) = &args.embedding_model {
                provider = provider.with_model(model.clone(), args.embedding_dimensions);
            }
            Ok(Arc::new(provider))
        }
    }
}

fn chat_provider(args: &GlobalArgs, chat: &ChatArgs) -> Result<Arc<dyn GenerationProvider>> {
    let provider = OpenAIChatProvider::new(api_key(args)?)?.with_model(chat.chat_model.clone());
    Ok(Arc::new(provider))
}

fn api_key(args: &GlobalArgs) -> Result<String> {
    args.openai_api_key
        .clone()
        .filter(|key| !key.is_empty())
        .context("OPENAI_API_KEY is not set; export it or pass --openai-api-key")
}
