//! Bedrock Model Detector CLI
//!
//! Local execution entry point. For AWS Lambda, use `detector-lambda`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use detector::{
    config,
    error::Result,
    models::{DetectorConfig, RegionOutcome},
    pipeline::Detector,
    services::{AgentCoreNotifier, BedrockCatalog},
    storage::{DynamoStore, LocalStore, StateStore},
};

/// Bedrock Model Detector
#[derive(Parser, Debug)]
#[command(
    name = "detector",
    version,
    about = "Watches Bedrock model catalogs across regions and notifies on new models"
)]
struct Cli {
    /// Path to the data directory for local state and config
    #[arg(short, long, default_value = "storage")]
    data_dir: PathBuf,

    /// Path to a TOML config file (default: {data_dir}/detector.toml,
    /// falling back to environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one detection tick across all configured regions
    Tick {
        /// Use the DynamoDB state table instead of local JSON files
        #[arg(long)]
        dynamo: bool,
    },

    /// Validate the configuration
    Validate,

    /// Show stored records per region
    Info {
        /// Limit output to one region
        #[arg(long)]
        region: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Resolve configuration: explicit file, conventional file, or environment.
fn resolve_config(cli: &Cli) -> Result<DetectorConfig> {
    if let Some(path) = &cli.config {
        return config::load_config(path);
    }
    let conventional = cli.data_dir.join("detector.toml");
    if conventional.exists() {
        return config::load_config(&conventional);
    }
    config::from_env()
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Model detector starting...");
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Tick { dynamo } => {
            let store: Arc<dyn StateStore> = if dynamo {
                Arc::new(DynamoStore::from_config(&config).await)
            } else {
                Arc::new(LocalStore::new(&cli.data_dir))
            };
            let catalog = Arc::new(BedrockCatalog::from_config(&config));
            let agent = Arc::new(AgentCoreNotifier::from_config(&config).await);

            let detector = Detector::new(config, catalog, store, agent)?;
            let report = detector.run_tick().await;

            for outcome in &report.outcomes {
                match outcome {
                    RegionOutcome::Completed(s) => {
                        log::info!(
                            "[{}] {} models, {} new, {} refreshed, {} removed, {} notified",
                            s.region,
                            s.models_seen,
                            s.created,
                            s.refreshed,
                            s.removed,
                            s.dispatched
                        );
                    }
                    RegionOutcome::Failed { region, error } => {
                        log::error!("[{}] failed: {}", region, error);
                    }
                }
            }

            if report.has_failures() {
                log::warn!(
                    "{} of {} regions failed; they will be retried on the next tick",
                    report.failed(),
                    report.outcomes.len()
                );
            }
        }

        Command::Validate => {
            log::info!("Configuration is valid");
            log::info!("  regions: {}", config.regions.join(", "));
            log::info!("  table: {}", config.table_name);
            log::info!("  agent runtime: {}", config.agent_runtime_arn);
            log::info!("  topic: {}", config.topic_arn);
            log::info!(
                "  renotify on return: {}",
                if config.renotify_on_return { "yes" } else { "no" }
            );
        }

        Command::Info { region } => {
            let store = LocalStore::new(&cli.data_dir);
            let regions: Vec<String> = match region {
                Some(r) => vec![r],
                None => config.regions.clone(),
            };

            for region in regions {
                let mut records: Vec<_> = store
                    .records_for_region(&region)
                    .await?
                    .into_values()
                    .collect();
                records.sort_by(|a, b| a.model_id.cmp(&b.model_id));

                println!("{} ({} records)", region, records.len());
                for record in records {
                    println!(
                        "  {} [{}] first seen {}, last seen {}, notified: {}",
                        record.model_id,
                        record.status.as_str(),
                        record.first_seen_at.format("%Y-%m-%d %H:%M"),
                        record.last_seen_at.format("%Y-%m-%d %H:%M"),
                        record.notified
                    );
                }
            }
        }
    }

    Ok(())
}
