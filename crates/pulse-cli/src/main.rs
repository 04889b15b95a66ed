//! DataPulse CLI
//!
//! Runs configured data quality checks against a dataset from a JSON run
//! configuration: source catalog, connection-string overrides, and checks.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use datapulse_checks::ValidatorRegistry;
use datapulse_connectors::{
    ConnectorRegistry, EnvSecretResolver, QueryLimits, SourceConfig, StaticCatalog,
};
use datapulse_core::{CheckConfig, Profile, QualityError, Result};
use datapulse_executor::{MemorySink, QualityEvaluator, StaticProfileStore};

#[derive(Parser)]
#[command(name = "datapulse")]
#[command(version, about = "DataPulse data quality runner", long_about = None)]
struct Cli {
    /// Path to the JSON run configuration
    #[arg(short, long, default_value = "datapulse.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate all matching checks for a dataset
    Evaluate {
        /// Dataset identifier, e.g.
        /// urn:li:dataset:(urn:li:dataPlatform:sqlite,orders,PROD)
        dataset: String,

        /// Print full records as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List the registered check types
    CheckTypes,
}

/// The JSON run configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunConfig {
    /// Source catalog entries, in priority order.
    sources: Vec<SourceConfig>,
    /// Explicit per-platform connection-string overrides.
    connectors: BTreeMap<String, String>,
    /// Checks to evaluate.
    checks: Vec<CheckConfig>,
    /// Inline profiles keyed by dataset identifier.
    profiles: BTreeMap<String, Profile>,
    /// Live-query timeout in seconds.
    query_timeout_secs: Option<u64>,
    /// Live-query row limit.
    query_row_limit: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            2
        }
    };
    process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::CheckTypes => {
            for check_type in ValidatorRegistry::builtin().check_types() {
                println!("{check_type}");
            }
            Ok(0)
        }
        Commands::Evaluate { dataset, json } => {
            let config = load_config(&cli.config)?;
            let evaluator = build_evaluator(config)?;
            let records = evaluator.evaluate(&dataset)?;
            evaluator.shutdown();

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&records)
                        .map_err(|err| QualityError::Execution(err.to_string()))?
                );
            } else {
                for record in &records {
                    let status = if record.outcome.success { "PASS" } else { "FAIL" };
                    let detail = record
                        .outcome
                        .native_results
                        .get("error")
                        .or(record.outcome.actual_value.as_ref())
                        .map(|s| format!("  ({s})"))
                        .unwrap_or_default();
                    println!(
                        "{status}  {name} [{check_type}]{detail}",
                        name = record.definition.check_name,
                        check_type = record.definition.native_type,
                    );
                }
                let failed = records.iter().filter(|r| !r.outcome.success).count();
                println!("{} checks, {} failed", records.len(), failed);
            }

            Ok(if records.iter().all(|r| r.outcome.success) {
                0
            } else {
                1
            })
        }
    }
}

fn load_config(path: &PathBuf) -> Result<RunConfig> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        QualityError::Config(format!("cannot read config {}: {err}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        QualityError::Config(format!("cannot parse config {}: {err}", path.display()))
    })
}

fn build_evaluator(config: RunConfig) -> Result<QualityEvaluator> {
    let registry = ConnectorRegistry::new(
        Box::new(StaticCatalog::new(config.sources)),
        Box::new(EnvSecretResolver),
    )
    .with_overrides(config.connectors);

    let mut profiles = StaticProfileStore::default();
    for (dataset_id, profile) in config.profiles {
        profiles = profiles.with_profile(dataset_id, profile);
    }

    let mut limits = QueryLimits::default();
    if let Some(secs) = config.query_timeout_secs {
        limits.timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(rows) = config.query_row_limit {
        limits.row_limit = rows;
    }

    info!(checks = config.checks.len(), "run configuration loaded");
    Ok(QualityEvaluator::new(
        registry,
        Box::new(profiles),
        Box::new(MemorySink::default()),
    )
    .with_checks(config.checks)
    .with_limits(limits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_parses_minimal_json() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert!(config.sources.is_empty());
        assert!(config.checks.is_empty());
    }

    #[test]
    fn run_config_parses_full_example() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "sources": [
                    {"name": "local", "platform": "sqlite", "config": {"path": "/tmp/x.db"}}
                ],
                "connectors": {"postgres": "postgresql://svc@db/warehouse"},
                "checks": [
                    {
                        "name": "volume",
                        "type": "table_row_count",
                        "dataset_pattern": "*orders*",
                        "params": {"min_rows": "1"}
                    }
                ],
                "profiles": {
                    "urn:li:dataset:(urn:li:dataPlatform:sqlite,orders,PROD)": {"row_count": 3}
                },
                "query_timeout_secs": 4,
                "query_row_limit": 100
            }"#,
        )
        .unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.checks[0].check_type, "table_row_count");
        assert_eq!(config.query_timeout_secs, Some(4));

        let evaluator = build_evaluator(config).unwrap();
        let records = evaluator
            .evaluate("urn:li:dataset:(urn:li:dataPlatform:sqlite,orders,PROD)")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].outcome.success);
    }
}
