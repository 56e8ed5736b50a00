//! Error types for the error log store

use rusqlite::ffi;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Same zap, message and timestamp already stored
    #[error("Duplicate log entry")]
    Duplicate,

    #[error("Invalid status '{0}'. Must be one of: unresolved, resolved, dismissed")]
    InvalidStatus(String),

    /// Year outside 0000-9999; SQLite could not read it back
    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking database task panicked or was cancelled
    #[error("Database task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

/// True if `err` is a UNIQUE (or primary key) constraint violation
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        let unique = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed".to_string()),
        );
        assert!(is_unique_violation(&unique));

        let not_null = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_NOTNULL),
            None,
        );
        assert!(!is_unique_violation(&not_null));
        assert!(!is_unique_violation(&rusqlite::Error::QueryReturnedNoRows));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(StoreError::Duplicate.to_string(), "Duplicate log entry");
        assert!(StoreError::InvalidStatus("bogus".to_string())
            .to_string()
            .contains("bogus"));
    }
}
