//! Error Log Store
//!
//! SQLite-backed persistent storage for error logs.
//! One connection guarded by a mutex; each operation locks it on a blocking
//! worker for a single statement and releases it on return.

use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::schema::{
    format_timestamp, is_storable, now_seconds, ErrorLogRecord, LogStatus, NewErrorLog, TIMESTAMP_FORMAT,
};
use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default cap for [`LogStore::list_all`]
pub const DEFAULT_LIST_LIMIT: usize = 1000;

const SELECT_COLUMNS: &str = "SELECT id, zap_name, error_message, explanation,
        strftime('%Y-%m-%d %H:%M:%S', timestamp) AS timestamp, status
     FROM error_logs";

/// Error log store backed by SQLite
#[derive(Clone)]
pub struct LogStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl LogStore {
    /// Open or create the store at `path` and make sure the schema exists
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!("Opening error log database at: {}", db_path.display());

        let open_path = db_path.clone();
        let conn = tokio::task::spawn_blocking(move || -> StoreResult<Connection> {
            let conn = Connection::open(&open_path)?;

            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;

            Ok(conn)
        })
        .await??;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        };

        store.init().await?;
        Ok(store)
    }

    /// Create the table and indexes if they are missing. Idempotent.
    pub async fn init(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS error_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    zap_name TEXT NOT NULL,
                    error_message TEXT NOT NULL,
                    explanation TEXT,
                    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                    status TEXT DEFAULT 'unresolved',
                    UNIQUE(zap_name, error_message, timestamp)
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_status ON error_logs(status)",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_zap_name ON error_logs(zap_name)",
                [],
            )?;

            Ok(())
        })
        .await
    }

    /// Insert a log stamped with the current time.
    ///
    /// Returns the new id, or [`StoreError::Duplicate`] when the same zap and
    /// message were already stored within this second.
    pub async fn insert(&self, log: NewErrorLog) -> StoreResult<i64> {
        self.insert_at(log, now_seconds()).await
    }

    /// Insert a log with an explicit timestamp (truncated to whole seconds).
    ///
    /// Timestamps outside years 0000-9999 are refused with
    /// [`StoreError::InvalidTimestamp`].
    pub async fn insert_at(&self, log: NewErrorLog, timestamp: NaiveDateTime) -> StoreResult<i64> {
        if !is_storable(&timestamp) {
            return Err(StoreError::InvalidTimestamp(timestamp.to_string()));
        }
        let ts = format_timestamp(&timestamp.trunc_subsecs(0));

        let result = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO error_logs (zap_name, error_message, explanation, timestamp)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![log.source_name, log.error_message, log.explanation, ts],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await;

        match result {
            Ok(id) => {
                debug!("Stored error log {}", id);
                Ok(id)
            }
            Err(StoreError::Sqlite(ref e)) if is_unique_violation(e) => {
                warn!("Duplicate log entry skipped");
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Newest first, at most `limit` records
    pub async fn list_all(&self, limit: usize) -> StoreResult<Vec<ErrorLogRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} ORDER BY timestamp DESC, id DESC LIMIT ?1",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![limit], record_from_row)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }

    /// Newest first, only records whose status equals `status`.
    ///
    /// The filter is passed straight to SQL; an unknown status matches nothing.
    pub async fn list_by_status(&self, status: &str) -> StoreResult<Vec<ErrorLogRecord>> {
        let status = status.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE status = ?1 ORDER BY timestamp DESC, id DESC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![status], record_from_row)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }

    /// Set the status of one log. Returns false if `id` does not exist.
    pub async fn update_status(&self, id: i64, new_status: &str) -> StoreResult<bool> {
        let status: LogStatus = new_status.parse()?;

        let count = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "UPDATE error_logs SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id],
                )?)
            })
            .await?;

        if count > 0 {
            info!("Log {} marked {}", id, status);
        }
        Ok(count > 0)
    }

    /// Delete every log, returning how many were removed
    pub async fn clear_all(&self) -> StoreResult<usize> {
        let count = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM error_logs", [])?))
            .await?;

        info!("Cleared {} error logs", count);
        Ok(count)
    }

    /// Get database path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn with_conn<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Connection) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await?
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ErrorLogRecord> {
    let raw_ts: String = row.get(4)?;
    let timestamp = NaiveDateTime::parse_from_str(&raw_ts, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let raw_status: Option<String> = row.get(5)?;
    let status = match raw_status {
        Some(s) => s.parse::<LogStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        None => LogStatus::default(),
    };

    Ok(ErrorLogRecord {
        id: row.get(0)?,
        source_name: row.get(1)?,
        error_message: row.get(2)?,
        explanation: row.get(3)?,
        timestamp,
        status,
    })
}
