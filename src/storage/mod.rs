//! Storage abstractions for model record persistence.
//!
//! The store owns two things: the durable `ModelRecord` per composite
//! (model id, region) key, and the short-lived dispatch claim taken before
//! an agent invocation so overlapping ticks do not double-dispatch.
//!
//! Backends:
//! - `LocalStore` — JSON files per region, for CLI runs and tests
//! - `DynamoStore` — the production table (feature `aws`)

pub mod local;

#[cfg(feature = "aws")]
pub mod dynamo;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::ModelRecord;

// Re-export for convenience
pub use local::LocalStore;

#[cfg(feature = "aws")]
pub use dynamo::DynamoStore;

/// Trait for model record storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// All records for a region, any status, keyed by model id.
    async fn records_for_region(&self, region: &str) -> Result<HashMap<String, ModelRecord>>;

    /// Idempotent write keyed on (model id, region): the record's durable
    /// fields are replaced wholesale. Safe to call twice with the same
    /// resulting record. The dispatch claim is store-managed and survives
    /// an upsert.
    async fn upsert_record(&self, record: &ModelRecord) -> Result<()>;

    /// Take the dispatch claim for a record via conditional write.
    ///
    /// Returns `false` when another tick holds an unexpired claim; the
    /// caller then skips dispatch and leaves the record pending.
    async fn try_claim_dispatch(
        &self,
        model_id: &str,
        region: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<bool>;

    /// Release the dispatch claim after a definite invocation failure so the
    /// next tick retries without waiting out the lease. A timed-out
    /// invocation keeps its claim — the agent may still complete.
    async fn release_dispatch_claim(&self, model_id: &str, region: &str) -> Result<()>;
}
