// src/pipeline/detect.rs

//! Detection orchestrator.
//!
//! One call to [`Detector::run_tick`] is one scheduled tick: every
//! configured region runs FETCH → DIFF → DISPATCH → PERSIST independently,
//! and a failed region never blocks the others. All decisions are re-derived
//! from stored records, so a tick that dies mid-run simply resumes correctly
//! on the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{DetectorConfig, ModelRecord, RegionOutcome, RegionSummary, TickReport};
use crate::services::{ModelCatalog, NotificationAgent};
use crate::storage::StateStore;

use super::diff::{ActionKind, Classifier, ReappearancePolicy};
use super::dispatch::Dispatcher;

/// Per-tick orchestrator over the configured regions.
pub struct Detector {
    config: DetectorConfig,
    catalog: Arc<dyn ModelCatalog>,
    store: Arc<dyn StateStore>,
    dispatcher: Dispatcher,
    classifier: Classifier,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Detector {
    /// Build a detector, failing fast on invalid configuration before any
    /// region is touched.
    pub fn new(
        config: DetectorConfig,
        catalog: Arc<dyn ModelCatalog>,
        store: Arc<dyn StateStore>,
        agent: Arc<dyn NotificationAgent>,
    ) -> Result<Self> {
        config.validate()?;

        let policy = if config.renotify_on_return {
            ReappearancePolicy::Renotify
        } else {
            ReappearancePolicy::Silent
        };

        Ok(Self {
            config,
            catalog,
            store,
            dispatcher: Dispatcher::new(agent),
            classifier: Classifier::new(policy),
        })
    }

    /// Run one detection tick across all configured regions.
    pub async fn run_tick(&self) -> TickReport {
        let concurrency = self.config.max_concurrent_regions.max(1);
        log::info!(
            "Starting model detection for {} regions",
            self.config.regions.len()
        );

        let outcomes = stream::iter(self.config.regions.clone())
            .map(|region| async move { self.process_region(&region).await })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = TickReport::new(outcomes);
        log::info!(
            "Tick complete: {} regions ok, {} failed, {} notifications dispatched",
            report.succeeded(),
            report.failed(),
            report.total_dispatched()
        );
        report
    }

    async fn process_region(&self, region: &str) -> RegionOutcome {
        match self.detect_region(region).await {
            Ok(summary) => RegionOutcome::Completed(summary),
            Err(e) => {
                log::error!("[{}] region tick failed: {}", region, e);
                RegionOutcome::Failed {
                    region: region.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn detect_region(&self, region: &str) -> Result<RegionSummary> {
        // FETCH
        let snapshot = self.catalog.list_model_ids(region).await?;

        // DIFF
        let prior = self.store.records_for_region(region).await?;
        let delta = self.classifier.classify(&snapshot, &prior);
        let mut summary = RegionSummary::new(region, snapshot.len());

        if delta.has_changes() {
            log::info!(
                "[{}] delta: {} create, {} refresh, {} remove",
                region,
                delta.count(ActionKind::Create),
                delta.count(ActionKind::Refresh),
                delta.count(ActionKind::Remove)
            );
        }

        // DISPATCH + PERSIST, per action
        for action in &delta.actions {
            let now = Utc::now();
            let existing = prior.get(&action.model_id);

            match action.kind {
                ActionKind::Create => {
                    let mut record = match existing {
                        Some(existing) => {
                            let mut record = existing.clone();
                            record.refresh(now);
                            record
                        }
                        None => ModelRecord::discovered(&action.model_id, region, now),
                    };

                    self.dispatch_with_claim(&mut record, &mut summary).await?;

                    self.store.upsert_record(&record).await?;
                    summary.created += 1;
                }
                ActionKind::Refresh => {
                    let mut record = existing
                        .cloned()
                        .ok_or_else(|| AppError::persistence("refresh without stored record"))?;
                    record.refresh(now);
                    self.store.upsert_record(&record).await?;
                    summary.refreshed += 1;
                }
                ActionKind::Remove => {
                    let mut record = existing
                        .cloned()
                        .ok_or_else(|| AppError::persistence("remove without stored record"))?;
                    record.mark_removed();
                    self.store.upsert_record(&record).await?;
                    summary.removed += 1;
                    log::info!("[{}] model removed from catalog: {}", region, action.model_id);
                }
            }
        }

        Ok(summary)
    }

    /// Attempt the lease-gated dispatch for a CREATE-classified record.
    ///
    /// The record is mutated to reflect the outcome; dispatch failures are
    /// entity-scoped and never escalate past this function.
    async fn dispatch_with_claim(
        &self,
        record: &mut ModelRecord,
        summary: &mut RegionSummary,
    ) -> Result<()> {
        let now = Utc::now();
        let lease = Duration::from_secs(self.config.dispatch_lease_secs);

        let claimed = self
            .store
            .try_claim_dispatch(&record.model_id, &record.region, now, lease)
            .await?;

        if !claimed {
            log::info!(
                "[{}] dispatch for {} skipped: claim held by a concurrent tick",
                record.region,
                record.model_id
            );
            summary.dispatch_skipped += 1;
            return Ok(());
        }

        match self
            .dispatcher
            .dispatch(&record.model_id, &record.region, record.first_seen_at)
            .await
        {
            Ok(()) => {
                record.mark_notified();
                summary.dispatched += 1;
            }
            Err(e) => {
                log::warn!(
                    "[{}] dispatch failed for {}: {}",
                    record.region,
                    record.model_id,
                    e
                );
                summary.dispatch_failures += 1;

                // A definite invocation failure frees the claim so the next
                // tick retries immediately. A timeout keeps it: the agent may
                // still be running.
                if matches!(e, AppError::AgentInvocation(_)) {
                    self.store
                        .release_dispatch_claim(&record.model_id, &record.region)
                        .await?;
                }
            }
        }

        Ok(())
    }
}
