//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order from a validated config
//! - Start background tasks (event logger, probe monitor)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Metrics recorder before breakers, so the first state gauge is exported
//! - Breakers for configured workers are created up front, so status
//!   reporting lists them before their first call

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::health::active::ProbeMonitor;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::{logging, metrics};
use crate::resilience::registry::BreakerRegistry;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Running subsystems.
pub struct Services {
    pub registry: Arc<BreakerRegistry>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl Services {
    /// Wait for every background task to finish.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task failed");
            }
        }
    }
}

/// Bring up the registry and background tasks. Must run inside a Tokio runtime.
pub fn start(config: &AppConfig, shutdown: &Shutdown) -> Result<Services, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let registry = Arc::new(BreakerRegistry::from_config(config));
    for worker in &config.workers {
        registry.get_or_create(&worker.service_name, &worker.endpoint, None);
    }

    let mut tasks = Vec::new();
    tasks.push(logging::spawn_event_logger(
        registry.subscribe(),
        shutdown.subscribe(),
    ));

    let monitor = ProbeMonitor::new(
        registry.clone(),
        config.workers.clone(),
        config.probe.clone(),
        config.retries.clone(),
    );
    let monitor_shutdown = shutdown.subscribe();
    tasks.push(tokio::spawn(async move {
        monitor.run(monitor_shutdown).await;
    }));

    tracing::info!(
        breakers = registry.len(),
        probes_enabled = config.probe.enabled,
        "Startup complete"
    );

    Ok(Services { registry, tasks })
}
