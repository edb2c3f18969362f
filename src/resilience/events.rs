//! Breaker event fan-out.
//!
//! # Design Decisions
//! - Backed by a Tokio broadcast channel: sending never blocks and never fails
//!   the sender, so subscribers cannot stall or break a breaker
//! - A subscriber that falls behind loses the oldest events (it sees `Lagged`)
//! - Emitting with no subscribers is a no-op

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::resilience::types::{BreakerKey, CallResult, StateTransition};

/// Something observers may want to know about a breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakerEvent {
    /// Trip, probe start, close, or manual reset.
    StateChanged(StateTransition),
    /// A protected call finished.
    CallRecorded { key: BreakerKey, result: CallResult },
}

impl BreakerEvent {
    pub fn key(&self) -> &BreakerKey {
        match self {
            BreakerEvent::StateChanged(t) => &t.key,
            BreakerEvent::CallRecorded { key, .. } => key,
        }
    }
}

/// Cloneable handle for publishing `BreakerEvent`s.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<BreakerEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns how many subscribers it reached.
    pub fn emit(&self, event: BreakerEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(1024)
    }
}
