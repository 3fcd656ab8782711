//! Error types for slowquery-dash (WASM-compatible)

use thiserror::Error;

/// Result type alias for slowquery-dash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that work in both native and WASM environments
///
/// None of these are fatal to a running dashboard: the session turns
/// backend and decoding errors into a degraded load status.
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Backend unavailable: {0}")]
    Backend(String),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
