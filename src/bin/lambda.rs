//! AWS Lambda entry point for the Bedrock Model Detector
//!
//! Deploy with `cargo lambda build --release --features lambda`.
//! Invoked on a fixed schedule with an empty payload; configuration comes
//! from the function environment.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use detector::config;
use detector::error::Result;
use detector::models::TickReport;
use detector::pipeline::Detector;
use detector::services::{AgentCoreNotifier, BedrockCatalog};
use detector::storage::DynamoStore;

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> std::result::Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Model detector Lambda starting...");
    lambda_runtime::run(service_fn(handler)).await
}

/// Handler for AWS Lambda events.
async fn handler(event: LambdaEvent<Value>) -> std::result::Result<Value, LambdaError> {
    info!("Received event: {:?}", event.payload);

    match run_detection().await {
        Ok(report) => {
            info!(
                "Detection tick completed: {} regions ok, {} failed, {} dispatched",
                report.succeeded(),
                report.failed(),
                report.total_dispatched()
            );
            Ok(serde_json::json!({ "status": "success", "report": report }))
        }
        Err(e) => {
            error!("Detection tick failed: {}", e);
            Ok(serde_json::json!({ "status": "error", "message": e.to_string() }))
        }
    }
}

/// Internal detection logic for the Lambda environment.
async fn run_detection() -> Result<TickReport> {
    let config = config::from_env()?;

    let catalog = Arc::new(BedrockCatalog::from_config(&config));
    let store = Arc::new(DynamoStore::from_config(&config).await);
    let agent = Arc::new(AgentCoreNotifier::from_config(&config).await);

    let detector = Detector::new(config, catalog, store, agent)?;
    Ok(detector.run_tick().await)
}
