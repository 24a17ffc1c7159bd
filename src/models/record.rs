//! Durable per-(model, region) observation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a model is currently visible in its region's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Active,
    Removed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "ACTIVE",
            RecordStatus::Removed => "REMOVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(RecordStatus::Active),
            "REMOVED" => Some(RecordStatus::Removed),
            _ => None,
        }
    }
}

/// One durable record per (model id, region) composite key.
///
/// Records are never deleted; they form the observation history the diff
/// engine classifies against on every tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelRecord {
    /// Opaque model identifier, stable across runs
    pub model_id: String,

    /// Provider region where the model was observed
    pub region: String,

    /// First detection time; set once at creation, never updated
    pub first_seen_at: DateTime<Utc>,

    /// Most recent detection time; bumped on every tick the model is present
    pub last_seen_at: DateTime<Utc>,

    /// True once a notification was successfully dispatched; never reverts
    pub notified: bool,

    /// Catalog visibility
    pub status: RecordStatus,
}

impl ModelRecord {
    /// Create the record for a model seen for the first time.
    pub fn discovered(model_id: impl Into<String>, region: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            model_id: model_id.into(),
            region: region.into(),
            first_seen_at: now,
            last_seen_at: now,
            notified: false,
            status: RecordStatus::Active,
        }
    }

    /// Record another sighting: bump `last_seen_at` (monotonically) and
    /// reactivate a removed record. `first_seen_at` and `notified` are
    /// untouched.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        if now > self.last_seen_at {
            self.last_seen_at = now;
        }
        self.status = RecordStatus::Active;
    }

    /// Mark the model as absent from the latest snapshot.
    pub fn mark_removed(&mut self) {
        self.status = RecordStatus::Removed;
    }

    /// Record a successful notification dispatch. Idempotent.
    pub fn mark_notified(&mut self) {
        self.notified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn discovered_initial_state() {
        let record = ModelRecord::discovered("anthropic.claude-v3", "us-east-1", ts(100));
        assert_eq!(record.status, RecordStatus::Active);
        assert!(!record.notified);
        assert_eq!(record.first_seen_at, ts(100));
        assert_eq!(record.last_seen_at, ts(100));
    }

    #[test]
    fn refresh_bumps_last_seen_monotonically() {
        let mut record = ModelRecord::discovered("m1", "us-east-1", ts(100));
        record.refresh(ts(200));
        assert_eq!(record.last_seen_at, ts(200));

        // A stale clock never rewinds the sighting time
        record.refresh(ts(150));
        assert_eq!(record.last_seen_at, ts(200));
        assert_eq!(record.first_seen_at, ts(100));
    }

    #[test]
    fn refresh_reactivates_removed_record() {
        let mut record = ModelRecord::discovered("m1", "us-east-1", ts(100));
        record.mark_notified();
        record.mark_removed();
        assert_eq!(record.status, RecordStatus::Removed);

        record.refresh(ts(300));
        assert_eq!(record.status, RecordStatus::Active);
        assert!(record.notified, "reappearance must not reset notified");
    }

    #[test]
    fn mark_notified_is_idempotent() {
        let mut record = ModelRecord::discovered("m1", "us-east-1", ts(100));
        record.mark_notified();
        record.mark_notified();
        assert!(record.notified);
    }

    #[test]
    fn status_round_trips_as_string() {
        assert_eq!(RecordStatus::parse("ACTIVE"), Some(RecordStatus::Active));
        assert_eq!(RecordStatus::parse("REMOVED"), Some(RecordStatus::Removed));
        assert_eq!(RecordStatus::parse("GONE"), None);
        assert_eq!(RecordStatus::Active.as_str(), "ACTIVE");
    }
}
