//! Common error types for gengap

use thiserror::Error;

/// Common result type for gengap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the pipeline stages
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input record or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal pipeline error
    #[error("Internal error: {0}")]
    Internal(String),
}
