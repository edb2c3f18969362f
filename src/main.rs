//! AI worker circuit breaker daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                     ai-worker-breaker                        │
//!   │                                                              │
//!   │  ┌──────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//!   │  │  probe   │──▶│   registry   │──▶│ breaker per          │──┼──▶ AI worker
//!   │  │ monitor  │   │ (service,    │   │ (service, endpoint)  │  │    /healthz
//!   │  └──────────┘   │  endpoint)   │   └──────────┬───────────┘  │
//!   │                 └──────────────┘              │              │
//!   │                                               ▼              │
//!   │                                  ┌────────────────────────┐  │
//!   │                                  │ events → event logger  │  │
//!   │                                  │ metrics → Prometheus   │  │
//!   │                                  └────────────────────────┘  │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ai_worker_breaker::config::{load_config, AppConfig};
use ai_worker_breaker::lifecycle::{signals, startup, Shutdown};
use ai_worker_breaker::observability::logging;

#[derive(Parser)]
#[command(name = "ai-worker-breaker")]
#[command(about = "Circuit breakers guarding calls to remote AI workers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the probe daemon until interrupted
    Run {
        /// TOML configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file and print the effective settings
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn read_config(path: Option<&PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(AppConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let config = read_config(Some(&config))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            for worker in &config.workers {
                let effective = config.breaker_for(&worker.key());
                println!("{} => {}", worker.key(), serde_json::to_string(&effective)?);
            }
        }
        Commands::Run { config } => {
            let config = read_config(config.as_ref())?;
            logging::init_logging(&config.observability)?;

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                workers = config.workers.len(),
                failure_threshold = config.breaker.failure_threshold,
                reset_timeout_ms = config.breaker.reset_timeout_ms,
                "ai-worker-breaker starting"
            );

            let shutdown = Shutdown::new();
            let services = startup::start(&config, &shutdown)?;
            let registry = services.registry.clone();

            signals::wait_for_shutdown_signal().await;
            shutdown.trigger();
            services.join().await;

            tracing::info!(
                metrics = %serde_json::to_string(&registry.list_all())?,
                "Final breaker metrics"
            );
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
