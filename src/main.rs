//! Agent gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    AGENT GATEWAY                      │
//!                 │                                                       │
//!   Client ───────┼─▶ listener ──▶ acceptor ──▶ ban list ──✗ (refused)    │
//!                 │                   │                                   │
//!                 │                   ▼                                   │
//!                 │            connection handler                         │
//!                 │          ┌────────┴─────────┐                         │
//!                 │          ▼                  ▼                         │
//!                 │    frame decoder ──▶ bounded queue ──▶ agent          │
//!                 │   (idle deadline)   (backpressure)                    │
//!                 │                                                       │
//!                 │  config · logging · metrics · signals · shutdown      │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use agent_gateway::config::validation::validate_config;
use agent_gateway::config::{load_config, ConfigError, GatewayConfig};
use agent_gateway::lifecycle::{signals, startup, Shutdown};
use agent_gateway::observability::logging::init_logging;
use agent_gateway::LoggingAgent;

#[derive(Parser)]
#[command(name = "agent-gateway")]
#[command(about = "TCP ingress gateway for length-prefixed agent traffic", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.service`.
    #[arg(short, long)]
    service: Option<String>,

    /// Log file, overrides `logging.file`.
    #[arg(long)]
    log_file: Option<String>,
}

fn build_config(cli: Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(service) = cli.service {
        config.listener.service = service;
    }
    if let Some(file) = cli.log_file {
        config.logging.file = Some(file);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match build_config(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Fatal error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Fatal error: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("Starting the server.");
    tracing::info!(
        service = %config.listener.service,
        idle_timeout_secs = config.timeouts.idle_secs,
        backpressure_secs = config.timeouts.backpressure_secs,
        queue_capacity = config.queue.capacity,
        "Configuration loaded"
    );

    let gateway = match startup::start(&config, Arc::new(LoggingAgent)).await {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            return ExitCode::FAILURE;
        }
    };

    if let Ok(addr) = gateway.local_addr() {
        tracing::info!(address = %addr, "Gateway OK.");
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    gateway.run(shutdown.subscribe()).await;

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
