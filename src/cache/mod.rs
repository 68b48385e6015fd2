//! Generic query cache for remote reads.
//!
//! This module provides a domain-agnostic cache that:
//! - Stores results under keys combining a query kind and its parameters
//! - Tracks idle/pending/success/error status per key
//! - Serves fresh results without a request and shares in-flight requests
//! - Invalidates whole query kinds after successful mutations
//!
//! Entries live in memory only; nothing here is persisted.

mod layer;
mod traits;

pub use layer::QueryCache;
pub use traits::{FetchOutcome, PollReport, QueryKey, QuerySnapshot, QueryStatus};
