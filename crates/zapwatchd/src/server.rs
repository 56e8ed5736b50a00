//! HTTP server for zapwatchd

use crate::middleware::body_size_limit;
use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{middleware, Router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use zapwatch_common::config::ServerConfig;
use zapwatch_common::{Classifier, LogStore, ZapwatchConfig};

/// Application state shared across handlers
pub struct AppState {
    pub store: LogStore,
    pub classifier: Classifier,
    /// Cap for unfiltered listings and exports
    pub list_limit: usize,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(store: LogStore, config: &ZapwatchConfig) -> Self {
        Self {
            store,
            classifier: Classifier::new(config.classifier.rules.clone()),
            list_limit: config.storage.list_limit,
            static_dir: config.server.static_dir.clone(),
        }
    }
}

/// Build the full router with middleware
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    let state = Arc::new(state);

    Router::new()
        .merge(routes::ingest_routes())
        .merge(routes::log_routes())
        .merge(routes::frontend_routes())
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            config.max_body_bytes,
            body_size_limit,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// Configured origins that are valid header values; the rest are logged and skipped
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin.escape_debug(), e);
                None
            }
        })
        .collect()
}

/// Any origin unless an allow-list is configured
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(parse_origins(&config.cors_origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState, config: &ZapwatchConfig) -> Result<()> {
    let app = build_router(state, &config.server);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("[BOOT] Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
