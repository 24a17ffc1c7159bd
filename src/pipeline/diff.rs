//! Diff calculation for catalog change detection.
//!
//! Compares a fetched snapshot against the stored records for the same
//! region and classifies every model id. This is pure set comparison; a
//! wrong transition here directly causes a duplicate or missed
//! notification, so the rules live in one place:
//!
//! - id in snapshot, no record yet → CREATE
//! - id in snapshot, record not yet notified (any status) → CREATE
//!   (a pending record whose dispatch is still owed)
//! - id in snapshot, ACTIVE and notified → REFRESH
//! - id in snapshot, REMOVED and notified → CREATE under the renotify
//!   policy, REFRESH (silent reactivation) otherwise
//! - id absent, record ACTIVE → REMOVE
//! - id absent, record REMOVED → no action

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{ModelRecord, RecordStatus};

/// What the orchestrator must do for one model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Refresh,
    Remove,
}

/// One classified model id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAction {
    pub model_id: String,
    pub kind: ActionKind,
}

impl ModelAction {
    fn new(model_id: &str, kind: ActionKind) -> Self {
        Self {
            model_id: model_id.to_string(),
            kind,
        }
    }
}

/// How a model that left the catalog and later returned is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReappearancePolicy {
    /// Reactivate silently; `notified` already being true suppresses dispatch
    #[default]
    Silent,
    /// Treat the return as a fresh detection and notify again
    Renotify,
}

/// Classified delta for one region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    /// Actions in deterministic (lexicographic) order
    pub actions: Vec<ModelAction>,
}

impl Delta {
    pub fn has_changes(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.kind != ActionKind::Refresh)
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }
}

/// Classifier for comparing snapshots against stored records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    policy: ReappearancePolicy,
}

impl Classifier {
    pub fn new(policy: ReappearancePolicy) -> Self {
        Self { policy }
    }

    /// Classify every id in `snapshot ∪ keys(prior)`.
    ///
    /// Output order is lexicographic by model id, present ids first, then
    /// removals — deterministic for reproducible logs.
    pub fn classify(
        &self,
        snapshot: &BTreeSet<String>,
        prior: &HashMap<String, ModelRecord>,
    ) -> Delta {
        let mut actions = Vec::new();

        for model_id in snapshot {
            let kind = match prior.get(model_id) {
                None => ActionKind::Create,
                Some(record) if !record.notified => ActionKind::Create,
                Some(record) if record.status == RecordStatus::Removed => match self.policy {
                    ReappearancePolicy::Renotify => ActionKind::Create,
                    ReappearancePolicy::Silent => ActionKind::Refresh,
                },
                Some(_) => ActionKind::Refresh,
            };
            actions.push(ModelAction::new(model_id, kind));
        }

        let mut absent: Vec<&str> = prior
            .values()
            .filter(|r| r.status == RecordStatus::Active && !snapshot.contains(&r.model_id))
            .map(|r| r.model_id.as_str())
            .collect();
        absent.sort_unstable();

        for model_id in absent {
            actions.push(ModelAction::new(model_id, ActionKind::Remove));
        }

        Delta { actions }
    }
}

/// Convenience function to classify with the default (silent) policy.
pub fn classify(snapshot: &BTreeSet<String>, prior: &HashMap<String, ModelRecord>) -> Delta {
    Classifier::default().classify(snapshot, prior)
}
