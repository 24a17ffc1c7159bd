// src/config.rs

//! Configuration loading utilities.
//!
//! CLI runs load a TOML file; Lambda loads everything from environment
//! variables. Both paths end in `DetectorConfig::validate`, so a
//! half-configured invocation fails before any region is processed.

use std::env;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::DetectorConfig;

/// Split a comma-separated region list, dropping blanks.
pub fn parse_region_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load configuration from a TOML file and validate it.
pub fn load_config(path: impl AsRef<Path>) -> Result<DetectorConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read {}: {e}", path.display())))?;
    let config: DetectorConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables and validate it.
///
/// Environment surface:
/// - `TARGET_REGIONS` — comma-separated region identifiers
/// - `DYNAMODB_TABLE_NAME` — state table name
/// - `AGENTCORE_RUNTIME_ARN` — agent invocation target
/// - `SNS_TOPIC_ARN` — notification channel the agent publishes to
/// - `CATALOG_TIMEOUT_SECS`, `AGENT_TIMEOUT_SECS`, `DISPATCH_LEASE_SECS`,
///   `MAX_CONCURRENT_REGIONS`, `RENOTIFY_ON_RETURN` — optional knobs
pub fn from_env() -> Result<DetectorConfig> {
    let base = DetectorConfig::default();

    let config = DetectorConfig {
        regions: parse_region_list(&env::var("TARGET_REGIONS").unwrap_or_default()),
        table_name: env::var("DYNAMODB_TABLE_NAME").unwrap_or(base.table_name),
        agent_runtime_arn: env::var("AGENTCORE_RUNTIME_ARN").unwrap_or_default(),
        topic_arn: env::var("SNS_TOPIC_ARN").unwrap_or_default(),
        catalog_timeout_secs: env_u64("CATALOG_TIMEOUT_SECS", base.catalog_timeout_secs)?,
        agent_timeout_secs: env_u64("AGENT_TIMEOUT_SECS", base.agent_timeout_secs)?,
        dispatch_lease_secs: env_u64("DISPATCH_LEASE_SECS", base.dispatch_lease_secs)?,
        max_concurrent_regions: env_u64("MAX_CONCURRENT_REGIONS", base.max_concurrent_regions as u64)?
            as usize,
        renotify_on_return: env_flag("RENOTIFY_ON_RETURN"),
    };

    config.validate()?;
    Ok(config)
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::config(format!("{key} must be a number, got '{value}'"))),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("True")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_region_list_splits_and_trims() {
        let regions = parse_region_list("us-east-1, us-west-2 ,ap-northeast-1");
        assert_eq!(regions, vec!["us-east-1", "us-west-2", "ap-northeast-1"]);
    }

    #[test]
    fn parse_region_list_drops_blanks() {
        assert!(parse_region_list("").is_empty());
        assert!(parse_region_list(" , ,").is_empty());
        assert_eq!(parse_region_list("us-east-1,,").len(), 1);
    }

    #[test]
    fn load_config_round_trips_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("detector.toml");
        std::fs::write(
            &path,
            r#"
regions = ["us-east-1"]
agent_runtime_arn = "arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/notifier"
topic_arn = "arn:aws:sns:us-east-1:123456789012:new-models"
renotify_on_return = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.regions, vec!["us-east-1"]);
        assert!(config.renotify_on_return);
        // Untouched knobs keep their defaults
        assert_eq!(config.table_name, "bedrock-model-detector");
    }

    #[test]
    fn load_config_rejects_empty_regions() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("detector.toml");
        std::fs::write(
            &path,
            r#"
agent_runtime_arn = "arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/notifier"
topic_arn = "arn:aws:sns:us-east-1:123456789012:new-models"
"#,
        )
        .unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn load_config_missing_file_is_config_error() {
        let err = load_config("/nonexistent/detector.toml").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
