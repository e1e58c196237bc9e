//! dirsearch - live full-text search over a directory tree
//!
//! Entry point for the dirsearch server.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use clap::Parser;
use dirsearch::index::IndexStore;
use dirsearch::search::SearchService;
use dirsearch::server::{init_tracing, metrics::init_metrics, App, AppState, ServerConfig};
use dirsearch::watcher::{watch_tree, PatternSyntax};
use dirsearch::{Config, Result};

/// dirsearch - live full-text search over a directory tree
#[derive(Parser, Debug)]
#[command(name = "dirsearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory tree to index and watch
    #[arg(short, long, env = "DIRSEARCH_ROOT", default_value = ".")]
    root: std::path::PathBuf,

    /// HTTP path of the search endpoint
    #[arg(short, long, env = "DIRSEARCH_ENDPOINT", default_value = "/search")]
    endpoint: String,

    /// Inclusion pattern matched against root-relative paths (empty matches all)
    #[arg(long, env = "DIRSEARCH_PATTERN", default_value = "")]
    pattern: String,

    /// Pattern syntax (regex, glob)
    #[arg(long, env = "DIRSEARCH_PATTERN_SYNTAX", default_value = "regex")]
    pattern_syntax: PatternSyntax,

    /// Directory holding the full-text index
    #[arg(long, env = "DIRSEARCH_INDEX_DIR", default_value = "./data/search-index")]
    index_dir: std::path::PathBuf,

    /// Host address to bind to
    #[arg(long, env = "DIRSEARCH_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "DIRSEARCH_PORT", default_value = "8080")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRSEARCH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "DIRSEARCH_LOG_JSON")]
    log_json: bool,

    /// Maximum hits returned per query
    #[arg(long, env = "DIRSEARCH_SEARCH_LIMIT", default_value = "10")]
    search_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("dirsearch v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config {
        root: cli.root,
        endpoint: cli.endpoint,
        pattern: cli.pattern,
        pattern_syntax: cli.pattern_syntax,
        index_dir: cli.index_dir,
        host: cli.host,
        port: cli.port,
        log_level: cli.log_level,
        search_limit: cli.search_limit,
    };

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;

    let store = IndexStore::open(&config.index_dir)?;
    tracing::info!(
        index = %store.location(),
        documents = store.num_docs(),
        "Index opened"
    );

    init_metrics();

    // The walk populates the index before the server starts answering.
    let mut watcher = watch_tree(
        &config.root,
        config.filter()?,
        Arc::new(store.clone()),
        &[config.index_dir.clone()],
    )?;

    let state = AppState::new(
        SearchService::new(store, config.search_limit),
        Arc::clone(watcher.stats()),
    );
    let result = App::new(ServerConfig::from(&config), state).run().await;

    watcher.stop();
    result
}
