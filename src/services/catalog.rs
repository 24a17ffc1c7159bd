//! Catalog snapshot fetcher.
//!
//! Retrieves the current set of model identifiers a region reports as
//! available. Pure read, no side effects, no internal retries — retry policy
//! belongs to the orchestrator's next tick.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;

/// Source of per-region model catalog snapshots.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Fetch the complete set of model ids currently listed in `region`.
    ///
    /// Fails with `CatalogUnavailable` when the provider API is unreachable
    /// or errors; the caller treats that as a per-region failure.
    async fn list_model_ids(&self, region: &str) -> Result<BTreeSet<String>>;
}

#[cfg(feature = "aws")]
pub use bedrock::BedrockCatalog;

#[cfg(feature = "aws")]
mod bedrock {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use aws_config::{BehaviorVersion, Region};
    use tracing::info;

    use crate::error::{AppError, Result};
    use crate::models::DetectorConfig;

    use super::ModelCatalog;

    /// Bedrock `ListFoundationModels` catalog source.
    ///
    /// A client is configured per region at call time; the listing is not
    /// paginated by the provider.
    pub struct BedrockCatalog {
        timeout: Duration,
    }

    impl BedrockCatalog {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }

        pub fn from_config(config: &DetectorConfig) -> Self {
            Self::new(Duration::from_secs(config.catalog_timeout_secs))
        }

        async fn client_for(&self, region: &str) -> aws_sdk_bedrock::Client {
            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load()
                .await;
            aws_sdk_bedrock::Client::new(&config)
        }
    }

    #[async_trait]
    impl ModelCatalog for BedrockCatalog {
        async fn list_model_ids(&self, region: &str) -> Result<BTreeSet<String>> {
            let client = self.client_for(region).await;

            let response = tokio::time::timeout(
                self.timeout,
                client.list_foundation_models().send(),
            )
            .await
            .map_err(|_| AppError::catalog_unavailable(region, "request timed out"))?
            .map_err(|e| AppError::catalog_unavailable(region, e))?;

            let model_ids: BTreeSet<String> = response
                .model_summaries()
                .iter()
                .map(|summary| summary.model_id().to_string())
                .collect();

            info!("[{}] {} models found", region, model_ids.len());
            Ok(model_ids)
        }
    }
}
