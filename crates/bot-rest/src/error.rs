//! REST error types

use thiserror::Error;

/// REST error type
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport-level failure (connect, timeout, body decode)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned {status} for {path}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },
}

/// REST result type
pub type RestResult<T> = Result<T, RestError>;
