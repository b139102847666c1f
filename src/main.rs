use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use argo_cli::{
    display_banner, parse_input, print_answer, print_help, print_table_reports, read_question,
    ConsoleObserver, ReplCommand,
};
use argo_core::config::parse_limit;
use argo_core::{
    AnswerGenerator, Embedder, EmbedderKind, IndexBackend, MappedCorpus, RagConfig, VectorIndex,
};
use argo_llm::{OpenAiEmbedder, OpenAiEmbeddingConfig, PerplexityClient};
use argo_rag::{
    HashingEmbedder, IngestionCoordinator, LocalVectorIndex, QdrantVectorIndex,
    RetrievalQueryEngine, RowDocumentMapper, SqliteSource,
};

#[derive(Parser)]
#[command(name = "argo")]
#[command(about = "Ask questions about a relational database with retrieval-augmented generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every table into documents and store their embeddings
    Build {
        /// SQLite database to read (overrides ARGO_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Maximum rows converted per table
        #[arg(long, conflicts_with = "no_limit")]
        limit: Option<String>,
        /// Convert every row of every table
        #[arg(long)]
        no_limit: bool,
        /// Documents embedded and stored per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Answer a question, or start an interactive session
    Query {
        /// Question to answer; omit for interactive mode
        #[arg(short, long)]
        question: Option<String>,
        /// Number of documents retrieved as context
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Load documents without indexing them and print a sample
    Extract {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long, default_value_t = 2000)]
        limit: usize,
        /// Number of documents to print
        #[arg(long, default_value_t = 2)]
        sample: usize,
    },
    /// Show how many documents the vector index holds
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let mut config = RagConfig::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Build {
            db,
            limit,
            no_limit,
            batch_size,
        } => {
            if let Some(db) = db {
                config.source_path = db;
            }
            if no_limit {
                config.limit_per_table = None;
            } else if let Some(raw) = limit {
                config.limit_per_table = parse_limit(&raw)?;
            }
            if let Some(size) = batch_size {
                config.batch_size = size;
            }
            build(&config).await
        }
        Commands::Query { question, top_k } => {
            if let Some(k) = top_k {
                config.top_k = k;
            }
            query(&config, question).await
        }
        Commands::Extract { db, limit, sample } => {
            if let Some(db) = db {
                config.source_path = db;
            }
            config.limit_per_table = Some(limit);
            extract(&config, sample).await
        }
        Commands::Stats => stats(&config).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("argo=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_index(config: &RagConfig) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match &config.index {
        IndexBackend::Local { path } => Arc::new(LocalVectorIndex::open(path)?),
        IndexBackend::Qdrant { url } => {
            Arc::new(QdrantVectorIndex::connect(url, config.collection.clone())?)
        }
    };
    Ok(index)
}

fn make_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.embedding_dim)?),
        EmbedderKind::OpenAi => {
            let openai =
                OpenAiEmbeddingConfig::from_env()?.with_model(config.embedding_model.clone());
            Arc::new(OpenAiEmbedder::new(openai)?)
        }
    };
    Ok(embedder)
}

async fn load_corpus(config: &RagConfig) -> Result<MappedCorpus> {
    let path = config.source_path.clone();
    let mapper = RowDocumentMapper::new(config.limit_per_table).with_page_size(config.page_size);
    println!("{} Reading {}", "📂".blue(), path.display());

    let corpus = tokio::task::spawn_blocking(move || {
        let source = SqliteSource::open(&path)?;
        mapper.map_source(source)
    })
    .await
    .context("row mapper task failed")??;

    print_table_reports(&corpus.tables);
    Ok(corpus)
}

async fn build(config: &RagConfig) -> Result<()> {
    let embedder = make_embedder(config)?;
    let index = open_index(config)?;

    let corpus = load_corpus(config).await?;
    println!(
        "{} Total documents: {}",
        "📄".blue(),
        corpus.documents.len()
    );

    let coordinator = IngestionCoordinator::new(embedder, index.clone(), config.batch_size)?;
    let report = coordinator.ingest(&corpus.documents, &ConsoleObserver).await?;

    println!(
        "{} Stored {} documents in {} batches ({} in index)",
        "🎉".green(),
        report.documents,
        report.batches,
        index.count().await?
    );
    let truncated = corpus.truncated_tables().count();
    if truncated > 0 {
        println!(
            "{} {} table(s) stopped at the row limit; use --no-limit to index every row",
            "ℹ️".blue(),
            truncated
        );
    }
    let failed = corpus.failed_tables().count();
    if failed > 0 {
        println!("{} {} table(s) could not be read completely", "⚠️".yellow(), failed);
    }
    Ok(())
}

async fn query(config: &RagConfig, question: Option<String>) -> Result<()> {
    let embedder = make_embedder(config)?;
    let index = open_index(config)?;
    let generator = Arc::new(PerplexityClient::from_env()?);
    let engine = RetrievalQueryEngine::new(embedder, index.clone(), generator.clone())
        .with_top_k(config.top_k);

    if let Some(question) = question {
        print_answer(&engine.ask(&question).await);
        return Ok(());
    }

    let documents = index.count().await.unwrap_or_default();
    display_banner(generator.model_id(), documents);

    let mut history = Vec::new();
    loop {
        let Some(input) = read_question(&mut history)? else {
            break;
        };
        match parse_input(&input) {
            ReplCommand::Skip => continue,
            ReplCommand::Exit => break,
            ReplCommand::Help => print_help(),
            ReplCommand::Ask(question) => {
                println!("{} Searching...", "🔎".blue());
                print_answer(&engine.ask(&question).await);
            }
        }
    }
    println!("{}", "👋 Goodbye!".green());
    Ok(())
}

async fn extract(config: &RagConfig, sample: usize) -> Result<()> {
    let corpus = load_corpus(config).await?;
    println!(
        "{} Total documents loaded: {}",
        "✅".green(),
        corpus.documents.len()
    );
    for doc in corpus.documents.iter().take(sample) {
        println!();
        println!("{}", doc.id.bold());
        println!("{}", doc.text);
    }
    Ok(())
}

async fn stats(config: &RagConfig) -> Result<()> {
    let index = open_index(config)?;
    let backend = match &config.index {
        IndexBackend::Local { path } => format!("local ({})", path.display()),
        IndexBackend::Qdrant { url } => {
            format!("qdrant ({}, collection {})", url, config.collection)
        }
    };
    println!("{}", "📊 Vector index:".bold());
    println!("   Backend: {}", backend);
    println!("   Documents stored: {}", index.count().await?);
    Ok(())
}
