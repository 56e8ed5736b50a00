//! API routes for zapwatchd
//!
//! Webhook ingestion, log management, CSV export and the dashboard page.

use crate::error::{ApiError, ApiResult};
use crate::export::{export_filename, render_csv};
use crate::server::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zapwatch_common::schema::{now_seconds, parse_timestamp, timestamp_from_unix};
use zapwatch_common::{ErrorLogRecord, NewErrorLog};

type AppStateArc = Arc<AppState>;

const MISSING_FIELDS: &str = "Missing zap_name or error_message";

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Ingestion Routes
// ============================================================================

/// Body of a Zapier webhook step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZapierPayload {
    pub zap_name: Option<String>,
    pub error_message: Option<String>,
    /// RFC 3339 / `YYYY-MM-DD HH:MM:SS` string, or unix seconds
    pub timestamp: Option<serde_json::Value>,
}

/// Manually created error log
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorLogCreate {
    pub zap_name: Option<String>,
    pub error_message: Option<String>,
    pub explanation: Option<String>,
}

pub fn ingest_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/zapier_payload", post(receive_zapier_payload))
        .route("/api/errors", post(create_error_log))
}

async fn receive_zapier_payload(
    State(state): State<AppStateArc>,
    payload: Result<Json<ZapierPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let (zap_name, error_message) = required_fields(payload.zap_name, payload.error_message)?;

    let timestamp = payload
        .timestamp
        .as_ref()
        .and_then(webhook_timestamp)
        .unwrap_or_else(now_seconds);

    let explanation = state.classifier.explain(&error_message).to_string();
    info!("Webhook error from zap '{}': {}", zap_name, explanation);

    let log = NewErrorLog::new(zap_name, error_message).with_explanation(explanation);
    let id = state.store.insert_at(log, timestamp).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn create_error_log(
    State(state): State<AppStateArc>,
    payload: Result<Json<ErrorLogCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let (zap_name, error_message) = required_fields(payload.zap_name, payload.error_message)?;

    let explanation = match payload.explanation.filter(|e| !e.is_empty()) {
        Some(given) => given,
        None => state.classifier.explain(&error_message).to_string(),
    };

    let log = NewErrorLog::new(zap_name, error_message).with_explanation(explanation);
    let id = state.store.insert(log).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

fn required_fields(
    zap_name: Option<String>,
    error_message: Option<String>,
) -> ApiResult<(String, String)> {
    match (zap_name, error_message) {
        (Some(zap), Some(msg)) if !zap.is_empty() && !msg.is_empty() => Ok((zap, msg)),
        _ => Err(ApiError::Validation(MISSING_FIELDS.to_string())),
    }
}

/// Interpret the optional webhook timestamp; unusable values fall back to server time
fn webhook_timestamp(raw: &serde_json::Value) -> Option<NaiveDateTime> {
    let parsed = match raw {
        serde_json::Value::String(s) if s.trim().is_empty() => return None,
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => n.as_i64().and_then(timestamp_from_unix),
        serde_json::Value::Null => return None,
        _ => None,
    };

    if parsed.is_none() {
        warn!("Ignoring unparseable webhook timestamp: {}", raw);
    }
    parsed
}

// ============================================================================
// Log Routes
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogStatusUpdate {
    pub status: String,
}

pub fn log_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/logs", get(get_logs).delete(delete_all_logs))
        .route("/api/logs/export", get(export_logs))
        .route("/api/logs/:id", patch(update_log))
}

async fn get_logs(
    State(state): State<AppStateArc>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<ErrorLogRecord>>> {
    let logs = fetch_logs(&state, query.status.as_deref()).await?;
    Ok(Json(logs))
}

async fn update_log(
    State(state): State<AppStateArc>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<LogStatusUpdate>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = path.map_err(|e| ApiError::Validation(e.body_text()))?;
    let Json(update) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    if !state.store.update_status(id, &update.status).await? {
        return Err(ApiError::NotFound("Log not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Status updated".to_string(),
    }))
}

async fn delete_all_logs(State(state): State<AppStateArc>) -> ApiResult<Json<MessageResponse>> {
    let count = state.store.clear_all().await?;
    Ok(Json(MessageResponse {
        message: format!("Deleted {} logs", count),
    }))
}

/// An empty status means no filter
async fn fetch_logs(state: &AppState, status: Option<&str>) -> ApiResult<Vec<ErrorLogRecord>> {
    let logs = match status.filter(|s| !s.is_empty()) {
        Some(status) => state.store.list_by_status(status).await?,
        None => state.store.list_all(state.list_limit).await?,
    };
    Ok(logs)
}

// ============================================================================
// Export Routes
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub status: Option<String>,
    pub format: Option<String>,
}

async fn export_logs(
    State(state): State<AppStateArc>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format = query.format.as_deref().unwrap_or("csv");
    if format != "csv" {
        return Err(ApiError::Validation("Unsupported export format".to_string()));
    }

    let logs = fetch_logs(&state, query.status.as_deref()).await?;
    let body = render_csv(&logs)?;
    let filename = export_filename(chrono::Local::now());
    debug!("Exporting {} logs as {}", logs.len(), filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    )
        .into_response())
}

// ============================================================================
// Frontend Routes
// ============================================================================

pub fn frontend_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(serve_frontend))
}

async fn serve_frontend(State(state): State<AppStateArc>) -> ApiResult<Html<String>> {
    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(content) => Ok(Html(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("Frontend not found".to_string()))
        }
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}
