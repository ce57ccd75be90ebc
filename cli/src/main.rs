//! Sitechat CLI Entry Point
//!
//! - `build`: ingest documents and rebuild the vector index
//! - `query`: print the top-k snippets for a question
//! - `context`: print the grounded prompt for a question
//! - `status`: report the current index

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitechat_cli::commands::{self, DocumentSource};
use sitechat_retrieval::{IndexStore, RetrievalConfig, Retriever, SearchMode, VectorEngine};

#[derive(Parser)]
#[command(name = "sitechat")]
#[command(about = "Build and query the sitechat document index")]
#[command(version)]
struct Args {
    /// Index directory (overrides SITECHAT_STORE_DIR)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Embedding model (overrides EMBED_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Nearest-neighbor search: exact or hnsw (overrides SITECHAT_SEARCH_MODE)
    #[arg(long, global = true)]
    search: Option<SearchMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from a docs directory or a JSON-lines file
    Build {
        /// Directory of .txt / .md files
        #[arg(long, conflicts_with = "jsonl")]
        docs: Option<PathBuf>,

        /// JSON-lines file of {"id", "text", "source"} records
        #[arg(long)]
        jsonl: Option<PathBuf>,
    },
    /// Show the most relevant snippets for a question
    Query {
        question: String,

        #[arg(long, short = 'k', default_value_t = 3)]
        top_k: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the prompt a generation model would receive
    Context {
        question: String,

        #[arg(long, short = 'k', default_value_t = 3)]
        top_k: usize,

        /// Print JSON (prompt, sampling params, sources)
        #[arg(long)]
        json: bool,
    },
    /// Report the current index
    Status,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitechat=info,sitechat_cli=info,sitechat_retrieval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(args) {
        tracing::error!("{:#}", e);
        if let Some(hint) = commands::rebuild_hint(&e) {
            tracing::error!("{hint}");
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = RetrievalConfig::from_env();
    if let Some(store) = args.store {
        config.store_dir = store;
    }
    if let Some(model) = args.model {
        config.embed_model = model;
    }
    if let Some(mode) = args.search {
        config.search_mode = mode;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let retriever = || -> anyhow::Result<Retriever> {
        tracing::debug!("Embedding model: {}", config.embed_model);
        let engine = Arc::new(VectorEngine::from_config(&config)?);
        Ok(Retriever::from_config(engine, &config))
    };

    match args.command {
        Command::Build { docs, jsonl } => {
            let docs_dir = docs.unwrap_or_else(|| PathBuf::from("data/docs"));
            let source = match &jsonl {
                Some(path) => DocumentSource::JsonLines(path),
                None => DocumentSource::Dir(&docs_dir),
            };
            commands::build(&retriever()?, source, &mut out)
        }
        Command::Query {
            question,
            top_k,
            json,
        } => commands::query(&retriever()?, &question, top_k, json, &mut out),
        Command::Context {
            question,
            top_k,
            json,
        } => commands::context(&retriever()?, &question, top_k, json, &mut out),
        Command::Status => commands::status(&IndexStore::from_config(&config), &mut out),
    }
}
