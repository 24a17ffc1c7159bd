// src/models/mod.rs

//! Domain models for the detector application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod report;

// Re-export all public types
pub use config::DetectorConfig;
pub use record::{ModelRecord, RecordStatus};
pub use report::{RegionOutcome, RegionSummary, TickReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request handed to the content-generation agent for one new model.
///
/// Serialized with the field names the agent contract uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub model_id: String,
    pub region: String,
    pub discovered_at: DateTime<Utc>,
}
