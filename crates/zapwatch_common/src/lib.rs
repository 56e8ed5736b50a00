//! Zapwatch Common - Shared types, storage and classification for zapwatch
//!
//! Error logs delivered by Zapier webhooks are classified here and kept in a
//! single SQLite table.

pub mod classifier;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use classifier::{Classifier, ClassifierRule, FALLBACK_EXPLANATION};
pub use config::ZapwatchConfig;
pub use error::{StoreError, StoreResult};
pub use schema::{ErrorLogRecord, LogStatus, NewErrorLog};
pub use store::LogStore;
