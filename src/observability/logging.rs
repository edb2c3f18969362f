//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Log every breaker event published on the registry channel
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, human-readable format for development
//! - `RUST_LOG` wins over the configured level
//! - The event logger is just another subscriber; if it lags it drops events,
//!   it never slows a breaker down

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;
use crate::resilience::events::BreakerEvent;

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ai_worker_breaker={},info", config.log_level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json_logs.then(|| fmt::layer().json()))
        .with((!config.json_logs).then(fmt::layer))
        .try_init()
}

/// Log breaker events until the channel closes or shutdown is signalled.
pub fn spawn_event_logger(
    mut events: broadcast::Receiver<BreakerEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event logger lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    tracing::debug!("Event logger received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}

fn log_event(event: &BreakerEvent) {
    match event {
        BreakerEvent::StateChanged(t) => tracing::info!(
            event_id = %t.id,
            breaker = %t.key,
            from = %t.from,
            to = %t.to,
            reason = %t.reason,
            metadata = ?t.metadata,
            timestamp_ms = t.timestamp_ms,
            "Breaker state changed"
        ),
        BreakerEvent::CallRecorded { key, result } => tracing::debug!(
            breaker = %key,
            outcome = result.outcome.as_str(),
            latency_ms = result.latency_ms,
            error = result.error.as_deref().unwrap_or(""),
            "Call recorded"
        ),
    }
}
