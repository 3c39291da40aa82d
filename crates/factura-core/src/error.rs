//! Error types for the factura-core library.
//!
//! Normalization and calculation never fail: every anomaly they meet is
//! corrected in place and reported as a warning. The variants here belong to
//! the layers around them (configuration, request validation, draft decoding).

use thiserror::Error;

/// Main error type for the factura library.
#[derive(Error, Debug)]
pub enum FacturaError {
    /// Configuration could not be loaded or holds an unusable value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The incoming request was rejected before reaching the pipeline.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The draft (or another JSON document) could not be decoded.
    #[error("malformed draft: {0}")]
    Draft(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the factura library.
pub type Result<T> = std::result::Result<T, FacturaError>;
