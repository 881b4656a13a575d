//! Result encoding
//!
//! Wraps pipeline output in a `{"results": [...]}` envelope carrying producer
//! metadata, and renders decode failures as `{"error", "reason"}` objects.

use crate::error::ScoringError;
use crate::{LEAD_SCORE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error label reported for payloads that fail to decode
pub const DECODE_ERROR_LABEL: &str = "JSON decode failed";

/// Producer metadata attached to every envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Envelope around a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub producer: Producer,
    /// When the results were computed (RFC3339)
    pub computed_at_utc: String,
    pub result_count: usize,
    pub results: Vec<T>,
}

/// Failure report returned in place of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub reason: String,
}

impl ErrorEnvelope {
    /// Describe a scoring error; decode failures use the decode label
    pub fn from_error(err: &ScoringError) -> Self {
        let error = match err {
            ScoringError::Decode(_) | ScoringError::Json(_) => DECODE_ERROR_LABEL,
            ScoringError::InvalidConfig(_) => "Invalid configuration",
            ScoringError::Encoding(_) => "Encoding failed",
        };
        Self {
            error: error.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Encoder for result envelopes
pub struct ResultEncoder {
    instance_id: String,
}

impl Default for ResultEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap results in an envelope stamped with the current time
    pub fn encode<T: Serialize>(&self, results: Vec<T>) -> ResultEnvelope<T> {
        ResultEnvelope {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: LEAD_SCORE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            result_count: results.len(),
            results,
        }
    }

    /// Encode to a compact JSON string
    pub fn encode_to_json<T: Serialize>(&self, results: Vec<T>) -> Result<String, ScoringError> {
        serde_json::to_string(&self.encode(results))
            .map_err(|e| ScoringError::Encoding(e.to_string()))
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json_pretty<T: Serialize>(
        &self,
        results: Vec<T>,
    ) -> Result<String, ScoringError> {
        serde_json::to_string_pretty(&self.encode(results))
            .map_err(|e| ScoringError::Encoding(e.to_string()))
    }
}
