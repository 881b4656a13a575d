//! Lead Score - engagement scoring for identity-keyed interaction events
//!
//! Two deterministic pipelines share one normalization stage:
//!
//! - **Scoring**: payload → normalization → per-event weight × recency →
//!   per-identity sum + burst and velocity bonuses → ranked [`IdentityScore`]s
//! - **Grouping**: payload → normalization → (identity, email) partitions →
//!   sorted, deduplicated event-type labels as [`IdentityGroup`]s
//!
//! Both are pure functions of the input payload and an immutable
//! [`ScoringConfig`].

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod grouper;
pub mod normalizer;
pub mod pipeline;
pub mod projection;
pub mod schema;
pub mod scoring;
pub mod temporal;
pub mod types;

pub use config::{EventWeights, ScoringConfig};
pub use error::ScoringError;
pub use pipeline::{group, score, BatchSummary, LeadScorer};
pub use types::{IdentityGroup, IdentityScore, NormalizedEvent};

// Schema exports
pub use schema::{EventBatch, EventPayload, PayloadAdapter, RawEvent};

/// Crate version embedded in result envelopes
pub const LEAD_SCORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for result envelopes
pub const PRODUCER_NAME: &str = "lead-score";
