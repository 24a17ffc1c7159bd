// src/pipeline/dispatch.rs

//! Notification dispatch for newly detected models.
//!
//! Builds the notification request and invokes the agent exactly once per
//! call. Persistence is deliberately not done here — the orchestrator owns
//! the separation between "decided to notify" and "durably recorded having
//! notified".

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::NotificationRequest;
use crate::services::NotificationAgent;

/// Dispatcher handing newly detected models to the notification agent.
pub struct Dispatcher {
    agent: Arc<dyn NotificationAgent>,
}

impl Dispatcher {
    pub fn new(agent: Arc<dyn NotificationAgent>) -> Self {
        Self { agent }
    }

    /// Invoke the agent for one model, awaiting its completion signal.
    pub async fn dispatch(
        &self,
        model_id: &str,
        region: &str,
        discovered_at: DateTime<Utc>,
    ) -> Result<()> {
        let request = NotificationRequest {
            model_id: model_id.to_string(),
            region: region.to_string(),
            discovered_at,
        };

        log::info!("[{}] dispatching notification for {}", region, model_id);
        self.agent.notify(&request).await
    }
}
