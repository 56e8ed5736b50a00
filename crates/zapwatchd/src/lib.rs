//! Zapwatch daemon library - exposes modules for testing.

pub mod error;
pub mod export;
pub mod middleware;
pub mod routes;
pub mod server;
