//! Error types for lead scoring

use thiserror::Error;

/// Errors that can occur while decoding payloads or computing results
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to decode event payload: {0}")]
    Decode(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
