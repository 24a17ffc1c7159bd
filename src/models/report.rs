//! Aggregate outcome of one detection tick.

use serde::{Deserialize, Serialize};

/// Per-region counters for a completed region pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,

    /// Models in the fetched snapshot
    pub models_seen: usize,

    /// Newly created or still-pending records processed as CREATE
    pub created: usize,

    /// Records with a `last_seen_at` bump only
    pub refreshed: usize,

    /// Records transitioned to REMOVED
    pub removed: usize,

    /// Notifications successfully dispatched
    pub dispatched: usize,

    /// Dispatch attempts that failed; retried next tick via the pending record
    pub dispatch_failures: usize,

    /// Dispatches skipped because another tick holds the claim
    pub dispatch_skipped: usize,
}

impl RegionSummary {
    pub fn new(region: impl Into<String>, models_seen: usize) -> Self {
        Self {
            region: region.into(),
            models_seen,
            ..Self::default()
        }
    }
}

/// Terminal state of one region within a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionOutcome {
    Completed(RegionSummary),
    Failed { region: String, error: String },
}

impl RegionOutcome {
    pub fn region(&self) -> &str {
        match self {
            RegionOutcome::Completed(summary) => &summary.region,
            RegionOutcome::Failed { region, .. } => region,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RegionOutcome::Failed { .. })
    }
}

/// One tick's aggregate result: a per-region outcome list, never a single
/// pass/fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub outcomes: Vec<RegionOutcome>,
}

impl TickReport {
    pub fn new(mut outcomes: Vec<RegionOutcome>) -> Self {
        // Regions complete in arbitrary order; report them deterministically.
        outcomes.sort_by(|a, b| a.region().cmp(b.region()));
        Self { outcomes }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn total_dispatched(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RegionOutcome::Completed(summary) => Some(summary.dispatched),
                RegionOutcome::Failed { .. } => None,
            })
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_orders_outcomes_by_region() {
        let report = TickReport::new(vec![
            RegionOutcome::Failed {
                region: "us-west-2".into(),
                error: "boom".into(),
            },
            RegionOutcome::Completed(RegionSummary::new("ap-northeast-1", 3)),
            RegionOutcome::Completed(RegionSummary::new("us-east-1", 5)),
        ]);

        let regions: Vec<&str> = report.outcomes.iter().map(|o| o.region()).collect();
        assert_eq!(regions, vec!["ap-northeast-1", "us-east-1", "us-west-2"]);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
    }

    #[test]
    fn total_dispatched_ignores_failed_regions() {
        let mut summary = RegionSummary::new("us-east-1", 2);
        summary.dispatched = 2;
        let report = TickReport::new(vec![
            RegionOutcome::Completed(summary),
            RegionOutcome::Failed {
                region: "us-west-2".into(),
                error: "catalog down".into(),
            },
        ]);
        assert_eq!(report.total_dispatched(), 2);
    }
}
