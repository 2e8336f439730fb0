//! Shared helpers used across CLI subcommands.

use std::sync::Arc;

use anyhow::{Context, Result};
use palmreader_session::{App, InMemoryHistory, Unconfigured};
use palmreader_store::StoreRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Open the store under the configured data directory and run the
/// application's cold start.
pub async fn start_app(config: &Config, history: Arc<InMemoryHistory>) -> Result<App> {
    let data_dir = &config.store.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let registry = StoreRegistry::new(data_dir);
    let app = App::start(&registry, history, Arc::new(Unconfigured))
        .await
        .context("failed to open store")?;
    info!(location = ?registry.location(), "store initialized");
    Ok(app)
}
