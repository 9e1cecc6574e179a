//! Paperlens CLI — scholarly document analysis from the command line.
//!
//! Parses a paper, runs the extraction units against the configured
//! generative backend (falling back to deterministic heuristics), and
//! prints the assembled analysis as JSON.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use paperlens_core::cache::InMemoryResultCache;
use paperlens_core::providers::create_backend;
use paperlens_core::registry::InMemoryTaskRegistry;
use paperlens_core::types::PaperSource;
use paperlens_core::{load_config, Orchestrator, TextGenerator};

/// Paperlens: analyze academic papers from the terminal
#[derive(Parser, Debug)]
#[command(name = "paperlens", version, about, long_about = None)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["file", "arxiv", "doi", "title"]),
))]
struct Cli {
    /// Path to an extracted-text paper file
    file: Option<PathBuf>,

    /// Analyze by arXiv identifier (e.g. 1512.03385)
    #[arg(long)]
    arxiv: Option<String>,

    /// Analyze by DOI (e.g. 10.1000/xyz123)
    #[arg(long)]
    doi: Option<String>,

    /// Analyze by paper title only
    #[arg(long)]
    title: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the result cache even for cacheable sources
    #[arg(long)]
    no_cache: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn source(&self) -> PaperSource {
        if let Some(path) = &self.file {
            PaperSource::File { path: path.clone() }
        } else if let Some(id) = &self.arxiv {
            PaperSource::Arxiv { id: id.clone() }
        } else if let Some(id) = &self.doi {
            PaperSource::Doi { id: id.clone() }
        } else {
            PaperSource::TitleOnly {
                title: self.title.clone().unwrap_or_default(),
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "paperlens", "paperlens")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "paperlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let mut config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    if cli.no_cache {
        config.cache.enabled = false;
    }

    let backend =
        create_backend(&config.llm).map_err(|e| anyhow::anyhow!("Backend setup failed: {e}"))?;
    info!(
        provider = %config.llm.provider,
        model = %backend.model_name(),
        cache = config.cache.enabled,
        "Starting analysis"
    );

    let registry = Arc::new(InMemoryTaskRegistry::new(config.registry.max_records));
    let cache = Arc::new(InMemoryResultCache::new());
    let orchestrator = Orchestrator::new(backend, config, registry, cache);

    let analysis = orchestrator.analyze_with_cache(&cli.source()).await?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
