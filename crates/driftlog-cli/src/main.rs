//! driftlog CLI - Command-line interface for the travel knowledge base.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use driftlog_chunk::RecursiveChunker;
use driftlog_core::{
    api_key_from_env, ChunkConfig, DocumentInput, DriftlogConfig, DriftlogError,
    GenerationRequest, Generator, SearchFilters, Store,
};
use driftlog_llm::{AnthropicGenerator, CohereReranker, OpenAiEmbedder};
use driftlog_query::{IngestPipeline, QueryConfig, QueryEngine, QueryResponse, RankedResult};
use driftlog_store::SqliteStore;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// driftlog - Ask grounded questions over your travel notes
#[derive(Parser)]
#[command(name = "driftlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Config file (default: <config dir>/driftlog/config.toml, then ./driftlog.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Ingest documents from a JSON file
    Ingest {
        /// File of the form {"documents": [{"content": ..., "location": ...}]}
        path: PathBuf,
    },

    /// Answer a question from the knowledge base
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ranked passages without generating an answer
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show statistics
    Stats,
}

#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Only use passages about this location
    #[arg(long)]
    location: Option<String>,

    /// Only use passages about this country
    #[arg(long)]
    country: Option<String>,

    /// Only use passages carrying one of these tags (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        SearchFilters {
            location: args.location,
            country: args.country,
            tags: if args.tags.is_empty() {
                None
            } else {
                Some(args.tags)
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct IngestFile {
    documents: Vec<DocumentInput>,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(cli: &Cli) -> CliResult<DriftlogConfig> {
    let mut config = match &cli.config {
        Some(path) => DriftlogConfig::load(path)?,
        None => DriftlogConfig::load_default()?,
    };
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Init => {
            init_database(&config)?;
        }
        Commands::Ingest { path } => {
            let store = open_store(&config)?;
            ingest(store, &config, &path).await?;
        }
        Commands::Ask {
            question,
            filters,
            json,
        } => {
            let store = open_store(&config)?;
            let generator = AnthropicGenerator::new(
                &config.generation,
                api_key_from_env(&config.generation.api_key_env)?,
            )?;
            let engine = build_engine(store, &config, Arc::new(generator))?;
            ask(&engine, &question, filters.into(), json).await?;
        }
        Commands::Search { query, filters } => {
            let store = open_store(&config)?;
            let engine = build_engine(store, &config, Arc::new(RetrievalOnly))?;
            search(&engine, &query, filters.into()).await?;
        }
        Commands::Stats => {
            let store = open_store(&config)?;
            stats(&store).await?;
        }
    }

    Ok(())
}

fn init_database(config: &DriftlogConfig) -> CliResult<()> {
    let path = &config.database.path;

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let _store = SqliteStore::open(path)?;
    println!("Initialized database at: {}", path.display());
    Ok(())
}

fn open_store(config: &DriftlogConfig) -> CliResult<Arc<SqliteStore>> {
    let path = &config.database.path;
    if !path.exists() {
        eprintln!(
            "Database not found at {}. Run 'driftlog init' first, or specify a path with -d.",
            path.display()
        );
        std::process::exit(1);
    }

    let store = SqliteStore::open(path)?;
    store.set_busy_timeout(config.database.busy_timeout_ms)?;
    Ok(Arc::new(store))
}

fn embedder(config: &DriftlogConfig) -> CliResult<Arc<OpenAiEmbedder>> {
    let key = api_key_from_env(&config.embedding.api_key_env)?;
    Ok(Arc::new(OpenAiEmbedder::new(&config.embedding, key)?))
}

type Engine = QueryEngine<SqliteStore, OpenAiEmbedder, CohereReranker, dyn Generator>;

fn build_engine(
    store: Arc<SqliteStore>,
    config: &DriftlogConfig,
    generator: Arc<dyn Generator>,
) -> CliResult<Engine> {
    let reranker = CohereReranker::new(
        &config.rerank,
        api_key_from_env(&config.rerank.api_key_env)?,
    )?;

    Ok(QueryEngine::new(
        store,
        embedder(config)?,
        Arc::new(reranker),
        generator,
        QueryConfig::from(config),
    ))
}

/// Stand-in generator for commands that stop after retrieval.
struct RetrievalOnly;

#[async_trait]
impl Generator for RetrievalOnly {
    async fn generate(&self, _request: &GenerationRequest) -> driftlog_core::Result<String> {
        Err(DriftlogError::internal("generation is not available for this command"))
    }
}

fn read_ingest_file(path: &Path) -> CliResult<Vec<DocumentInput>> {
    let content = fs::read_to_string(path)?;
    let file: IngestFile = serde_json::from_str(&content)?;
    Ok(file.documents)
}

async fn ingest(store: Arc<SqliteStore>, config: &DriftlogConfig, path: &Path) -> CliResult<()> {
    let documents = read_ingest_file(path)?;

    if documents.is_empty() {
        println!("No documents found in: {}", path.display());
        return Ok(());
    }

    println!("Ingesting {} document(s)...", documents.len());

    let pipeline = IngestPipeline::new(
        store,
        embedder(config)?,
        Arc::new(RecursiveChunker::new()),
        ChunkConfig::from(&config.chunking),
    );

    let mut created = 0;
    let mut duplicates = 0;
    let mut failed = 0;
    let mut chunks = 0;

    for (i, document) in documents.into_iter().enumerate() {
        let label = document
            .location
            .clone()
            .unwrap_or_else(|| format!("#{}", i + 1));

        match pipeline.ingest(document).await {
            Ok(outcome) if outcome.duplicate => {
                println!("  {} - duplicate of {}", label, outcome.document_id);
                duplicates += 1;
            }
            Ok(outcome) => {
                println!("  {} - {} chunk(s)", label, outcome.chunks);
                created += 1;
                chunks += outcome.chunks;
            }
            Err(e) => {
                eprintln!("  {} - Error: {}", label, e);
                failed += 1;
            }
        }
    }

    println!(
        "\nComplete: {} ingested ({} chunks), {} duplicate, {} failed",
        created, chunks, duplicates, failed
    );

    Ok(())
}

async fn ask(engine: &Engine, question: &str, filters: SearchFilters, json: bool) -> CliResult<()> {
    engine.rebuild_lexical_index().await?;
    let response = engine.query(question, &filters).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &QueryResponse) {
    let answer = &response.answer;
    println!("{}\n", answer.answer);

    if !answer.citations.is_empty() {
        println!("Sources:");
        for citation in &answer.citations {
            println!(
                "  [{}] {} ({})\n      {}",
                citation.index, citation.source, citation.location, citation.excerpt
            );
        }
        println!();
    }

    println!(
        "confidence {:.4} | {} retrieved, {} used | {} | {}ms",
        answer.confidence,
        answer.chunks_retrieved,
        answer.chunks_after_rerank,
        response.retrieval_strategy,
        response.latency_ms
    );
}

async fn search(engine: &Engine, query: &str, filters: SearchFilters) -> CliResult<()> {
    engine.rebuild_lexical_index().await?;
    let retrieval = engine.retrieve(query, &filters).await?;

    if retrieval.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{} result(s) from {} candidates ({})\n",
        retrieval.results.len(),
        retrieval.chunks_retrieved,
        retrieval.strategy
    );
    for (i, result) in retrieval.results.iter().enumerate() {
        println!("{}", format_result(i + 1, result));
    }
    Ok(())
}

fn format_result(position: usize, result: &RankedResult) -> String {
    let sources: Vec<String> = result.sources().iter().map(|s| s.to_string()).collect();
    format!(
        "{}. [{}] {} | {}\n   rerank={:.4} rrf={:.4}\n   {}",
        position,
        sources.join("+"),
        result.chunk.metadata.source_label(),
        result.chunk.metadata.location_label(),
        result.rerank_score.unwrap_or(0.0),
        result.rrf_score.unwrap_or(0.0),
        driftlog_query::excerpt(&result.chunk.content, driftlog_query::DEFAULT_EXCERPT_CHARS)
    )
}

async fn stats(store: &SqliteStore) -> CliResult<()> {
    let stats = store.get_stats().await?;
    println!("Documents:  {}", stats.documents);
    println!("Chunks:     {}", stats.chunks);
    println!("Embeddings: {}", stats.embeddings);
    println!("Storage:    {} bytes", stats.storage_bytes);
    Ok(())
}
