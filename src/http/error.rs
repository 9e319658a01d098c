//! Error types for the HTTP abstractions.

use thiserror::Error;

/// Errors raised while reading a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// The request lacks a header an operation depends on.
    #[error("Missing request header: {0}")]
    MissingHeader(String),

    #[error("Invalid JSON body: {0}")]
    JsonError(#[from] serde_json::Error),
}
