//! Event bus.
//!
//! An explicit subscriber list per event kind, invoked synchronously from
//! the producer's task — not a `tokio::sync::broadcast` channel.
//! Subscribers must return promptly and must not block; the engine never
//! awaits them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AssetBalance, EmergencyAction, EmergencyReason, SpreadOpportunity, Ticker, TradeResult, VenueId};

/// Engine-level status, mirrored in `StatusChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    Idle,
    Running,
    Paused,
    StoppedByRiskLimit,
    Error,
}

/// Events published by the engine to interested subscribers (UI,
/// persistence, ...). Fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArbEvent {
    StatusChanged { status: EngineStatus, message: Option<String> },
    OpportunityFound { opportunity: SpreadOpportunity, pair_symbol: String },
    TradeCompleted { result: TradeResult },
    PriceUpdated { venue: VenueId, symbol: String, ticker: Ticker },
    ErrorOccurred { message: String, source: String },
    BalancePoolUpdated {
        total_value_quote: Decimal,
        realized_pnl: Decimal,
        realized_pnl_pct: Decimal,
        drawdown_pct: Decimal,
        per_asset: Vec<AssetBalance>,
    },
    EmergencyTriggered {
        reason: EmergencyReason,
        message: String,
        current: Decimal,
        threshold: Decimal,
        recommended_action: EmergencyAction,
    },
}

/// A non-blocking event subscriber. Implementations must return quickly
/// and must not take any engine lock.
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &ArbEvent);
}

/// Synchronous fan-out subscriber list. One call to `publish` invokes every
/// registered subscriber in registration order, on the publishing task.
pub struct EventBus {
    subscribers: parking_lot::RwLock<Vec<std::sync::Arc<dyn EventSubscriber>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: parking_lot::RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: std::sync::Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Publishes `event` to every subscriber, in order. Never panics on a
    /// subscriber's behalf is not guaranteed (subscribers run in-process);
    /// the bus itself never blocks on I/O.
    pub fn publish(&self, event: &ArbEvent) {
        for subscriber in self.subscribers.read().iter() {
            subscriber.on_event(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
