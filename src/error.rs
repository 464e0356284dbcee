//! Error types for the element table cache

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or starting a cache
///
/// Lookups and teardown are total and never produce one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// Staleness window shorter than the supported minimum
    #[error("Staleness window {requested:?} is out of range: must be at least {minimum:?}")]
    StalenessOutOfRange {
        requested: Duration,
        minimum: Duration,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (sweep thread or runtime could not be started)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
