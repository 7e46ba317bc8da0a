//! Error types for Resurface
//!
//! The capture pipeline and the scorer are total and never fail. These errors
//! belong to the surfaces around them: JSON decoding, configuration loading
//! and store snapshots.

use thiserror::Error;

/// Errors that can occur outside the core transforms
#[derive(Debug, Error)]
pub enum ResurfaceError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Unknown stack: {0}")]
    UnknownStack(String),
}
