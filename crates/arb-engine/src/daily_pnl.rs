//! Tracks the engine's per-UTC-day `DailyPnL` aggregate.
//!
//! Subscribes to `TradeCompleted` the same way `TradePnlFeeder` feeds the
//! balance pool's loss window, decoupling the scheduler's trade-completion
//! path from this aggregate's internals. Day-boundary reset mirrors
//! `RiskGate::reset_if_new_day`'s chrono UTC-date comparison.

use std::sync::Arc;

use arb_core::events::{ArbEvent, EventSubscriber};
use arb_core::types::{DailyPnL, TradeResult};
use arb_core::venue::Clock;
use chrono::NaiveDate;
use parking_lot::Mutex;

/// Guards one running `DailyPnL`; resets in place once the UTC date moves on.
pub struct DailyPnlTracker {
    clock: Arc<dyn Clock>,
    state: Mutex<DailyPnL>,
}

impl DailyPnlTracker {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        Self { clock, state: Mutex::new(DailyPnL::new(today)) }
    }

    /// Resets to a fresh `DailyPnL` if `today` differs from the stored date.
    /// Called both from the scheduler's poll loop (alongside the risk
    /// gate's own reset) and lazily before recording a trade, so a day
    /// boundary crossed with no trades still shows up on the next read.
    pub fn reset_if_new_day(&self, today: NaiveDate) {
        let mut state = self.state.lock();
        if state.date != today {
            *state = DailyPnL::new(today);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> DailyPnL {
        self.state.lock().clone()
    }

    fn record(&self, result: &TradeResult) {
        self.reset_if_new_day(self.clock.now().date_naive());
        self.state.lock().record(result);
    }
}

impl EventSubscriber for DailyPnlTracker {
    fn on_event(&self, event: &ArbEvent) {
        if let ArbEvent::TradeCompleted { result } = event {
            self.record(result);
        }
    }
}
