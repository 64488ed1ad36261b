//! Error types for query client operations.

use thiserror::Error;

/// Errors produced by the scheduler, transports, and cache.
///
/// HTTP error statuses are not errors here: they arrive as a
/// [`QueryResponse`](crate::core::QueryResponse) with a non-200 status.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request could not be sent or its body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// A request URL could not be resolved against the service base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Configuration was rejected during validation.
    #[error("config invalid: {0}")]
    Config(String),
    /// A persistent cache store failed.
    #[error("cache error: {0}")]
    Cache(String),
    /// The request was dropped from the pending queue before dispatch.
    #[error("request cancelled before dispatch")]
    Cancelled,
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
