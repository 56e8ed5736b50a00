//! Zapwatch Daemon - Zapier error log dashboard
//!
//! Receives failed-zap webhooks, classifies and stores them, and serves the
//! log API and dashboard.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use zapwatch_common::{LogStore, ZapwatchConfig};
use zapwatchd::server::{self, AppState};

#[derive(Debug, Parser)]
#[command(name = "zapwatchd", version, about = "Zapier error log dashboard daemon")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "ZAPWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] zapwatchd v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut config =
        ZapwatchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db) = args.db {
        config.storage.db_path = db;
    }
    info!("[BOOT] Config loaded");

    let store = LogStore::open(&config.storage.db_path)
        .await
        .context("Failed to open error log database")?;
    info!("[BOOT] Database ready at {}", store.path().display());

    let state = AppState::new(store, &config);
    info!(
        "[BOOT] Classifier loaded with {} rules",
        state.classifier.rules().len()
    );

    server::run(state, &config).await
}
