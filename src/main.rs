use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use ragvault::{
    DocumentLoader, Embedder, OllamaEmbeddingProvider, SqliteVectorStore, VaultConfig,
    VaultService,
};

#[derive(Parser)]
#[command(name = "ragvault")]
#[command(about = "Chunk, embed, and search local documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load documents from a file or directory into the vault")]
    Ingest {
        #[arg(help = "File or directory to ingest")]
        path: PathBuf,

        #[arg(long, help = "Do not descend into subdirectories")]
        no_recursive: bool,
    },

    #[command(about = "Search the vault for chunks similar to a query")]
    Search {
        #[arg(help = "The query text")]
        query: String,

        #[arg(short = 'n', long, default_value = "5", help = "Maximum results")]
        limit: usize,

        #[arg(short = 't', long, help = "Minimum similarity score")]
        threshold: Option<f32>,
    },

    #[command(about = "Show collection statistics")]
    Stats,

    #[command(about = "Delete every stored point in the collection")]
    Clear {
        #[arg(short = 'y', long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragvault=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = VaultConfig::from_env()?;

    match cli.command {
        Commands::Ingest { path, no_recursive } => {
            let service = build_service(&config).await?;
            let loader = DocumentLoader::new();
            let documents = loader.load_path(&path, !no_recursive).await?;
            if documents.is_empty() {
                println!("No supported documents found under {}", path.display());
            } else {
                let stored = service.ingest(&documents).await?;
                println!(
                    "Ingested {} document(s) as {} chunk(s) into '{}'",
                    documents.len(),
                    stored,
                    config.storage.collection
                );
            }
            service.shutdown().await?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
        } => {
            let service = build_service(&config).await?;
            let hits = service.query(&query, limit, threshold).await?;
            if hits.is_empty() {
                println!("No matches.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                let source = hit.source().unwrap_or("<unknown>");
                println!("{}. [{:.4}] {}", rank + 1, hit.score, source);
                if let Some(text) = hit.text() {
                    println!("   {}", text.replace('\n', "\n   "));
                }
            }
            service.shutdown().await?;
        }
        Commands::Stats => {
            let service = build_service(&config).await?;
            let stats = service.stats().await?;
            println!("collection:     {}", stats.name);
            println!("total points:   {}", stats.total_points);
            println!("indexed points: {}", stats.indexed_points);
            println!("status:         {}", stats.status);
            service.shutdown().await?;
        }
        Commands::Clear { yes } => {
            if !yes && !confirm_clear(&config.storage.collection)? {
                println!("Aborted.");
                return Ok(());
            }
            let service = build_service(&config).await?;
            service.clear().await?;
            println!("Cleared collection '{}'", config.storage.collection);
            service.shutdown().await?;
        }
    }

    Ok(())
}

async fn build_service(config: &VaultConfig) -> Result<VaultService> {
    let provider = OllamaEmbeddingProvider::new(
        &config.embedding.endpoint,
        &config.embedding.model,
    );
    let embedder = Embedder::probe(Arc::new(provider))
        .await
        .context("probing the embedding provider failed; is Ollama running?")?
        .with_batch_size(config.embedding.batch_size);

    let store = SqliteVectorStore::open(
        &config.storage.path,
        &config.storage.collection,
        embedder.dimension(),
        config.storage.metric,
    )
    .await
    .with_context(|| format!("opening vector store at {}", config.storage.path.display()))?;

    let chunker = ragvault::TextChunker::new(
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    )?;

    Ok(VaultService::new(chunker, embedder, store))
}

fn confirm_clear(collection: &str) -> Result<bool> {
    print!("Delete every point in '{collection}'? Type 'yes' to confirm: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
