//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - Classification API HTTP client for StatementClassifier
//! - Local filesystem for FileAccess

pub mod classifier_api;
pub mod duckdb;
pub mod local_files;

#[cfg(test)]
pub mod classifier_mock;
