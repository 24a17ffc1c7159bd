//! Application configuration structures.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root detector configuration.
///
/// Loaded from a TOML file for CLI runs or from environment variables in
/// Lambda; see `crate::config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Regions whose catalogs are watched
    #[serde(default)]
    pub regions: Vec<String>,

    /// Name of the state table (DynamoDB backend)
    #[serde(default = "defaults::table_name")]
    pub table_name: String,

    /// ARN of the content-generation agent runtime to invoke per new model
    #[serde(default)]
    pub agent_runtime_arn: String,

    /// ARN of the notification channel the agent publishes to
    #[serde(default)]
    pub topic_arn: String,

    /// Timeout for one catalog listing call, in seconds
    #[serde(default = "defaults::catalog_timeout")]
    pub catalog_timeout_secs: u64,

    /// Timeout for one agent invocation, in seconds
    #[serde(default = "defaults::agent_timeout")]
    pub agent_timeout_secs: u64,

    /// Lifetime of the dispatch claim taken before invoking the agent
    #[serde(default = "defaults::dispatch_lease")]
    pub dispatch_lease_secs: u64,

    /// Maximum regions processed concurrently per tick
    #[serde(default = "defaults::max_concurrent_regions")]
    pub max_concurrent_regions: usize,

    /// Whether a model that left the catalog and later returned is
    /// renotified. Off by default: reappearance silently reactivates.
    #[serde(default)]
    pub renotify_on_return: bool,
}

impl DetectorConfig {
    /// Validate configuration values for basic sanity.
    ///
    /// An empty region list is fatal: the tick must not start half-configured.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(AppError::config("No target regions configured"));
        }
        if self.regions.iter().any(|r| r.trim().is_empty()) {
            return Err(AppError::config("Blank region identifier in region list"));
        }
        if self.table_name.trim().is_empty() {
            return Err(AppError::validation("table_name is empty"));
        }
        if self.agent_runtime_arn.trim().is_empty() {
            return Err(AppError::validation("agent_runtime_arn is empty"));
        }
        if self.topic_arn.trim().is_empty() {
            return Err(AppError::validation("topic_arn is empty"));
        }
        if self.catalog_timeout_secs == 0 {
            return Err(AppError::validation("catalog_timeout_secs must be > 0"));
        }
        if self.agent_timeout_secs == 0 {
            return Err(AppError::validation("agent_timeout_secs must be > 0"));
        }
        if self.dispatch_lease_secs == 0 {
            return Err(AppError::validation("dispatch_lease_secs must be > 0"));
        }
        if self.max_concurrent_regions == 0 {
            return Err(AppError::validation("max_concurrent_regions must be > 0"));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            table_name: defaults::table_name(),
            agent_runtime_arn: String::new(),
            topic_arn: String::new(),
            catalog_timeout_secs: defaults::catalog_timeout(),
            agent_timeout_secs: defaults::agent_timeout(),
            dispatch_lease_secs: defaults::dispatch_lease(),
            max_concurrent_regions: defaults::max_concurrent_regions(),
            renotify_on_return: false,
        }
    }
}

mod defaults {
    pub fn table_name() -> String {
        "bedrock-model-detector".into()
    }
    pub fn catalog_timeout() -> u64 {
        30
    }
    pub fn agent_timeout() -> u64 {
        120
    }
    pub fn dispatch_lease() -> u64 {
        120
    }
    pub fn max_concurrent_regions() -> usize {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DetectorConfig {
        DetectorConfig {
            regions: vec!["us-east-1".into(), "ap-northeast-1".into()],
            agent_runtime_arn: "arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/notifier".into(),
            topic_arn: "arn:aws:sns:us-east-1:123456789012:new-models".into(),
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn validate_sample_config_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_region_list() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_region() {
        let mut config = sample();
        config.regions.push("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = sample();
        config.catalog_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.agent_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.dispatch_lease_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_agent_target() {
        let mut config = sample();
        config.agent_runtime_arn.clear();
        assert!(config.validate().is_err());
    }
}
