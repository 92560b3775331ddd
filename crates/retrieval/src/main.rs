//! AstroMenu retrieval CLI
//!
//! Reads a CSV of questions about galactic restaurant dishes, runs each one
//! through the extract/search/verify pipeline against the configured vector
//! index and completion service, and writes one result record per question.

use anyhow::Context;
use astromenu_common::config::AppConfig;
use astromenu_common::DishCatalog;
use astromenu_retrieval::index::QdrantIndex;
use astromenu_retrieval::pipeline::{run_batch, BatchOptions, RetrievalPipeline};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "retrieve", version, about = "Retrieval pipeline over the galactic dish index")]
struct Cli {
    /// CSV file of question records (row_id, question, difficulty)
    questions_file: PathBuf,

    /// Output CSV for result records
    #[arg(short, long, default_value = ".output/results.csv")]
    output: PathBuf,

    /// Process only questions with this difficulty label
    #[arg(short, long, value_parser = ["Easy", "Medium", "Hard", "Impossible"])]
    difficulty: Option<String>,

    /// Load configuration from this file instead of the layered defaults
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path).context("Failed to load configuration file")?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };

    init_tracing(&config);
    tracing::info!(
        version = astromenu_common::VERSION,
        collection = %config.index.collection,
        completion_model = %config.completion.model,
        embedding_model = %config.embedding.model,
        "Starting retrieval run"
    );

    let completion = astromenu_common::completion::OpenAiCompletion::new(&config.completion)
        .context("Failed to build completion client")?;
    let embedder = astromenu_common::embeddings::OpenAiEmbedder::new(&config.embedding)
        .context("Failed to build embedding client")?;
    let index = QdrantIndex::new(&config.index).context("Failed to build index client")?;
    let catalog =
        DishCatalog::from_json_file(&config.catalog.path).context("Failed to load dish catalog")?;

    let pipeline = Arc::new(RetrievalPipeline::new(
        Arc::new(completion),
        Arc::new(embedder),
        Arc::new(index),
        Arc::new(catalog),
        config.retrieval.top_k,
    ));

    let options = BatchOptions {
        questions_file: cli.questions_file,
        output_file: cli.output,
        difficulty: cli.difficulty,
        concurrency: config.retrieval.concurrency,
        audit_dir: config.retrieval.audit_dir.as_ref().map(PathBuf::from),
    };

    let summary = run_batch(pipeline, &options).await?;
    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        invalid_rows = summary.invalid_rows,
        empty_results = summary.empty_results,
        "Retrieval run finished"
    );

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
