//! Inbound event schema
//!
//! This module defines the request payload shape (batches of interaction
//! events) and the adapter that decodes it from JSON.

mod adapter;
mod raw_event;

pub use adapter::*;
pub use raw_event::*;
