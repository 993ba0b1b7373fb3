//! Common error types for keyword audit

use thiserror::Error;

/// Common result type for keyword audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the keyword audit crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure talking to the analysis backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed CSV upload
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend rejected the identity token (HTTP 401) or the session expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend answered with a non-success status
    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
