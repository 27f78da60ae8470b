//! toolcat-import - bulk tool import service
//!
//! Accepts batches of `(name, link)` records over HTTP, enriches each one via
//! the configured enrichment service and stores it in the tool catalog.
//! Progress is streamed over SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toolcat_common::config::{ConfigResolver, RootFolderInitializer};
use toolcat_common::events::EventBus;
use toolcat_import::db::SqliteToolStore;
use toolcat_import::services::{BatchProcessorConfig, HttpEnrichmentClient};
use toolcat_import::AppState;

/// Command-line arguments; these override environment and config file values
#[derive(Debug, Parser)]
#[command(name = "toolcat-import", version, about = "Bulk tool import service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "TOOLCAT_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Data folder holding toolcat.db
    #[arg(long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root_folder) = args.root_folder {
        config.root_folder = Some(root_folder);
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting toolcat-import v{}", env!("CARGO_PKG_VERSION"));
    info!("Port: {}", config.port);

    let initializer = RootFolderInitializer::new(config.resolved_root_folder());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = toolcat_import::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let enricher = HttpEnrichmentClient::from_config(&config.enrichment)
        .context("Failed to configure enrichment client")?;
    info!(
        "Enrichment endpoint: {}",
        config.enrichment.endpoint.as_deref().unwrap_or_default()
    );

    let event_bus = EventBus::new(100);
    let store = SqliteToolStore::new(db_pool.clone());

    let state = AppState::new(
        db_pool,
        event_bus,
        Arc::new(enricher),
        Arc::new(store),
        BatchProcessorConfig::from(&config.import),
    );

    let app = toolcat_import::build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
