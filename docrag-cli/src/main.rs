//! `docrag` command-line front end.
//!
//! Every command prints JSON on stdout; logs go to stderr and are filtered
//! with `RUST_LOG`. Provider settings come from the environment (a `.env`
//! file is loaded first), see [`ProviderConfig::from_env`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docrag::{
    DocRag, HttpReranker, OpenAIChatCompletion, OpenAIEmbeddingProvider, ProviderConfig,
    RagConfig,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(about = "Build and search per-document vector collections", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding one collection per document
    #[arg(long, global = true, env = "DOCRAG_ROOT", default_value = "doc_db/vector_db")]
    root: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the collection for a document
    Create(BuildArgs),
    /// Delete and rebuild the collection for a document
    Rebuild(BuildArgs),
    /// Show the state of a collection
    Status {
        /// Document id
        doc_id: String,
    },
    /// Delete a collection
    Delete {
        /// Document id
        doc_id: String,
    },
    /// List document ids that have a collection
    List,
    /// Show collection and chunk totals
    Stats,
    /// Search one or more collections
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Document id
    doc_id: String,

    /// Text file holding the document content
    #[arg(long)]
    file: PathBuf,

    /// Document title (defaults to the file stem)
    #[arg(long)]
    title: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long, default_value_t = 500)]
    chunk_size: usize,

    /// Characters repeated between consecutive chunks
    #[arg(long, default_value_t = 100)]
    chunk_overlap: usize,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Query text
    query: String,

    /// Document id to search (repeatable)
    #[arg(long = "doc", required = true)]
    docs: Vec<String>,

    /// Number of results
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// Rerank merged results with the relevance model
    #[arg(long)]
    rerank: bool,

    /// Drop results scoring below this value
    #[arg(long)]
    threshold: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let providers = ProviderConfig::from_env();
    match cli.command {
        Command::Create(args) => {
            let config = build_config(&args)?;
            let rag = engine(&cli.root, config, providers)?;
            let document = read_document(&args).await?;
            let status = rag
                .create(&document)
                .await
                .with_context(|| format!("failed to create collection for '{}'", args.doc_id))?;
            print_json(&status)
        }
        Command::Rebuild(args) => {
            let config = build_config(&args)?;
            let rag = engine(&cli.root, config, providers)?;
            let document = read_document(&args).await?;
            let status = rag
                .rebuild(&document)
                .await
                .with_context(|| format!("failed to rebuild collection for '{}'", args.doc_id))?;
            print_json(&status)
        }
        Command::Status { doc_id } => {
            let rag = engine(&cli.root, RagConfig::default(), providers)?;
            print_json(&rag.status(&doc_id).await)
        }
        Command::Delete { doc_id } => {
            let rag = engine(&cli.root, RagConfig::default(), providers)?;
            rag.delete(&doc_id)
                .await
                .with_context(|| format!("failed to delete collection for '{doc_id}'"))?;
            print_json(&json!({ "deleted": doc_id }))
        }
        Command::List => {
            let rag = engine(&cli.root, RagConfig::default(), providers)?;
            print_json(&rag.list_all().await)
        }
        Command::Stats => {
            let rag = engine(&cli.root, RagConfig::default(), providers)?;
            print_json(&rag.stats().await)
        }
        Command::Search(args) => {
            let mut builder = RagConfig::builder().top_k(args.top_k);
            if let Some(threshold) = args.threshold {
                builder = builder.similarity_threshold(threshold);
            }
            let rag = engine(&cli.root, builder.build()?, providers)?;
            let ids: Vec<&str> = args.docs.iter().map(String::as_str).collect();
            let results = rag.search_many(&ids, &args.query, args.rerank).await;
            print_json(&results)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = match (verbose, quiet) {
        (true, _) => "debug",
        (_, true) => "warn",
        _ => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_config(args: &BuildArgs) -> Result<RagConfig> {
    Ok(RagConfig::builder().chunk_size(args.chunk_size).chunk_overlap(args.chunk_overlap).build()?)
}

/// Wire the HTTP providers, or placeholders when no API key is configured.
fn engine(root: &std::path::Path, config: RagConfig, providers: ProviderConfig) -> Result<DocRag> {
    let builder = DocRag::builder().config(config).root(root);
    let builder = if providers.api_key.is_some() {
        builder
            .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(providers.clone())?))
            .reranker(Arc::new(HttpReranker::new(providers.clone())?))
            .chat(Arc::new(OpenAIChatCompletion::new(providers)?))
    } else {
        warn!("no API key configured; using placeholder embeddings and keyword search");
        builder.placeholder_dimensions(providers.embedding_dimensions)
    };
    let rag = builder.build()?;
    info!(root = %root.display(), "engine ready");
    Ok(rag)
}

async fn read_document(args: &BuildArgs) -> Result<docrag::Document> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let title = args.title.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.doc_id.clone())
    });
    let metadata = HashMap::from([
        ("title".to_string(), title),
        ("source".to_string(), args.file.display().to_string()),
    ]);
    Ok(docrag::Document { id: args.doc_id.clone(), content, metadata })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
