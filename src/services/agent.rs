//! Content-generation agent client.
//!
//! The agent composes the human-readable alert and publishes it to the
//! notification channel itself; our responsibility ends at a successful,
//! acknowledged invocation.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::NotificationRequest;

/// Invocable notification agent.
#[async_trait]
pub trait NotificationAgent: Send + Sync {
    /// Invoke the agent for one newly detected model and await its
    /// completion signal.
    ///
    /// Fails with `AgentTimeout` / `AgentInvocation`; both are entity-scoped
    /// and retried on the next tick through the pending record.
    async fn notify(&self, request: &NotificationRequest) -> Result<()>;
}

#[cfg(feature = "aws")]
pub use agentcore::AgentCoreNotifier;

#[cfg(feature = "aws")]
mod agentcore {
    use std::time::Duration;

    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_sdk_bedrockagentcore::Client;
    use aws_sdk_bedrockagentcore::primitives::Blob;
    use tracing::info;
    use uuid::Uuid;

    use crate::error::{AppError, Result};
    use crate::models::{DetectorConfig, NotificationRequest};

    use super::NotificationAgent;

    /// AgentCore runtime client for the notification agent.
    pub struct AgentCoreNotifier {
        client: Client,
        runtime_arn: String,
        timeout: Duration,
    }

    impl AgentCoreNotifier {
        pub fn new(client: Client, runtime_arn: impl Into<String>, timeout: Duration) -> Self {
            Self {
                client,
                runtime_arn: runtime_arn.into(),
                timeout,
            }
        }

        /// Create a notifier from the default AWS environment.
        pub async fn from_config(config: &DetectorConfig) -> Self {
            let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
            Self::new(
                Client::new(&aws),
                config.agent_runtime_arn.clone(),
                Duration::from_secs(config.agent_timeout_secs),
            )
        }

        fn build_prompt(request: &NotificationRequest) -> String {
            format!(
                "A new Amazon Bedrock foundation model has been detected. \
                 Compose a short, friendly notification message and send it \
                 with the send_notification tool. Call the tool exactly once \
                 and do not finish without calling it.\n\n\
                 Model ID: {}\nRegion: {}\nDiscovered at: {}",
                request.model_id,
                request.region,
                request.discovered_at.to_rfc3339(),
            )
        }
    }

    #[async_trait]
    impl NotificationAgent for AgentCoreNotifier {
        async fn notify(&self, request: &NotificationRequest) -> Result<()> {
            let mut payload = serde_json::to_value(request)?;
            payload["prompt"] = serde_json::Value::String(Self::build_prompt(request));

            // Runtime session ids must be at least 33 characters
            let session_id = format!("detector-{}", Uuid::new_v4());

            let invocation = async {
                let output = self
                    .client
                    .invoke_agent_runtime()
                    .agent_runtime_arn(&self.runtime_arn)
                    .runtime_session_id(session_id)
                    .payload(Blob::new(serde_json::to_vec(&payload)?))
                    .qualifier("DEFAULT")
                    .send()
                    .await
                    .map_err(|e| AppError::agent(e.into_service_error()))?;

                // The aggregated response body is the completion signal
                let body = output
                    .response
                    .collect()
                    .await
                    .map_err(|e| AppError::agent(e))?;
                Ok::<_, AppError>(body.into_bytes())
            };

            let body = tokio::time::timeout(self.timeout, invocation)
                .await
                .map_err(|_| AppError::AgentTimeout(self.timeout))??;

            let text = String::from_utf8_lossy(&body);
            info!(
                "[{}] agent acknowledged {}: {}",
                request.region,
                request.model_id,
                text.chars().take(200).collect::<String>()
            );
            Ok(())
        }
    }
}
