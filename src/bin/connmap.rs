//! connmap CLI: check connection configurations and map signals offline.
//!
//! Usage:
//!   connmap validate --config connection.yaml
//!   connmap map --config connection.yaml --signal signal.json [--metrics]

use clap::{Parser, Subcommand};
use connectivity_mapping::model::{keys, ExternalMessage};
use connectivity_mapping::{
    ConnectivityConfig, DefaultProtocolAdapter, MappedSignal, MappingMetrics, MappingOutcome,
    MessageMapperFactory, MetricsSnapshot, OutboundMappingProcessor, OutboundSignal, Signal,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "connmap",
    version,
    about = "Outbound signal mapping for connectivity gateways"
)]
struct Cli {
    /// Log pipeline decisions at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a connection configuration and build its mappers
    Validate {
        /// Path to the connection YAML file
        #[arg(long)]
        config: PathBuf,
    },
    /// Map a signal to the configured targets and print the outcomes
    Map {
        /// Path to the connection YAML file
        #[arg(long)]
        config: PathBuf,
        /// Path to a JSON signal
        #[arg(long)]
        signal: PathBuf,
        /// Include a telemetry snapshot in the report
        #[arg(long)]
        metrics: bool,
    },
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
enum OutcomeReport<'a> {
    Mapped {
        topic: Option<String>,
        targets: Vec<&'a str>,
        message: &'a ExternalMessage,
    },
    Dropped {
        topic: Option<String>,
    },
    Error {
        topic: Option<String>,
        mapper: &'a str,
        correlation_id: Option<&'a str>,
        error: String,
    },
}

impl<'a> OutcomeReport<'a> {
    fn of(outcome: &'a MappingOutcome<MappedSignal>) -> Self {
        let topic = outcome.topic_path().map(|t| t.path());
        match outcome {
            MappingOutcome::Mapped { value, .. } => OutcomeReport::Mapped {
                topic,
                targets: value.targets.iter().map(|t| t.address.as_str()).collect(),
                message: &value.external_message,
            },
            MappingOutcome::Dropped { .. } => OutcomeReport::Dropped { topic },
            MappingOutcome::Error { cause, mapper_id, .. } => OutcomeReport::Error {
                topic,
                mapper: mapper_id,
                correlation_id: cause.correlation_id.as_deref(),
                error: cause.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct MapReport<'a> {
    connection_id: &'a str,
    outcomes: Vec<OutcomeReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<MetricsSnapshot>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_processor(config_path: &Path) -> Result<(ConnectivityConfig, OutboundMappingProcessor), String> {
    let config = ConnectivityConfig::from_file(config_path)
        .map_err(|e| format!("Failed to load '{}': {}", config_path.display(), e))?;
    let processor = config
        .processor(
            &MessageMapperFactory::with_builtins(),
            Arc::new(DefaultProtocolAdapter::new()),
        )
        .map_err(|e| format!("Invalid mapping configuration: {}", e))?;
    Ok((config, processor))
}

/// Read a signal, filling in a correlation id if it has none.
fn read_signal(path: &Path) -> Result<Signal, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let mut signal: Signal = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse signal '{}': {}", path.display(), e))?;
    if signal.headers.correlation_id().is_none() {
        signal
            .headers
            .insert(keys::CORRELATION_ID, uuid::Uuid::new_v4().to_string());
    }
    Ok(signal)
}

fn cmd_validate(config_path: &Path) -> i32 {
    match build_processor(config_path) {
        Ok((config, processor)) => {
            println!(
                "Connection '{}' ({}) is valid: {} mapper(s) [{}], {} target(s)",
                config.connection.id,
                config.connection.connection_type,
                processor.registry().len(),
                processor.registry().ids().join(", "),
                config.targets.len()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_map(config_path: &Path, signal_path: &Path, with_metrics: bool) -> i32 {
    let (config, processor) = match build_processor(config_path) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let signal = match read_signal(signal_path) {
        Ok(signal) => signal,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let metrics = Arc::new(MappingMetrics::new());
    let processor = processor.with_metrics(metrics.clone());
    let outbound = OutboundSignal::new(signal, config.targets.clone());
    let outcomes = match processor.process(&outbound) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let report = MapReport {
        connection_id: config.connection.id.as_str(),
        outcomes: outcomes.iter().map(OutcomeReport::of).collect(),
        metrics: with_metrics.then(|| metrics.snapshot()),
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{}", json);
            if outcomes.iter().any(|o| o.is_error()) {
                2
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("Error: failed to render report: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let code = match cli.command {
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Map {
            config,
            signal,
            metrics,
        } => cmd_map(&config, &signal, metrics),
    };
    std::process::exit(code);
}
