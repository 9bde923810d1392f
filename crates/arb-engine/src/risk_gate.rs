//! The risk gate.
//!
//! Checked before each trade attempt and at the top of each poll:
//! daily-loss / consecutive-failure tracking behind `AtomicU32` and
//! lock-guarded aggregates, with a day-boundary reset driven by chrono
//! UTC-date comparison rather than a unix-seconds day index.

use std::sync::atomic::{AtomicU32, Ordering};

use arb_core::config::RiskConfig;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::warn;

/// Why the risk gate is refusing to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskStop {
    MaxDailyLoss,
    MaxTradesPerDay,
    MaxConsecutiveLosses,
}

/// Result of a risk-gate check at the top of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Ok,
    Stop(RiskStop),
}

struct Aggregates {
    today_date: NaiveDate,
    today_net_pnl: Decimal,
    today_trade_count: u32,
    consecutive_losses: u32,
    last_trade_time: Option<DateTime<Utc>>,
}

/// Stateful predicate guarding trade attempts. One instance per engine,
/// shared across the scheduler and executor.
pub struct RiskGate {
    config: RiskConfig,
    aggregates: Mutex<Aggregates>,
    // Mirrors `today_trade_count` for lock-free reads from logging/metrics,
    // matching `CrossCircuitBreaker`'s split of atomics vs lock-guarded state.
    trade_count_hint: AtomicU32,
}

impl RiskGate {
    #[must_use]
    pub fn new(config: RiskConfig, today: NaiveDate) -> Self {
        Self {
            config,
            aggregates: Mutex::new(Aggregates {
                today_date: today,
                today_net_pnl: Decimal::ZERO,
                today_trade_count: 0,
                consecutive_losses: 0,
                last_trade_time: None,
            }),
            trade_count_hint: AtomicU32::new(0),
        }
    }

    /// Resets daily counters if `today` differs from the last recorded date.
    /// Called at the top of every poll; day resets happen
    /// at first poll after the UTC boundary, not on a timer.
    pub fn reset_if_new_day(&self, today: NaiveDate) {
        let mut agg = self.aggregates.lock();
        if agg.today_date != today {
            agg.today_date = today;
            agg.today_net_pnl = Decimal::ZERO;
            agg.today_trade_count = 0;
            agg.consecutive_losses = 0;
            self.trade_count_hint.store(0, Ordering::SeqCst);
        }
    }

    /// Stop-level check: daily loss, trade count, consecutive losses. Does
    /// not consider cooldown (cooldown only defers a single trade, it never
    /// stops the engine).
    #[must_use]
    pub fn check(&self) -> GateVerdict {
        let agg = self.aggregates.lock();
        if agg.today_net_pnl < Decimal::ZERO && -agg.today_net_pnl >= self.config.max_daily_loss {
            return GateVerdict::Stop(RiskStop::MaxDailyLoss);
        }
        if agg.today_trade_count >= self.config.max_trades_per_day {
            return GateVerdict::Stop(RiskStop::MaxTradesPerDay);
        }
        if agg.consecutive_losses >= self.config.max_consecutive_losses {
            return GateVerdict::Stop(RiskStop::MaxConsecutiveLosses);
        }
        GateVerdict::Ok
    }

    /// Whether a new trade may be attempted right now, given `min_time_between_trades`.
    /// `false` defers this trade only; the engine keeps running.
    #[must_use]
    pub fn cooldown_ok(&self, now: DateTime<Utc>) -> bool {
        let agg = self.aggregates.lock();
        match agg.last_trade_time {
            None => true,
            Some(last) => now.signed_duration_since(last)
                >= chrono::Duration::from_std(self.config.min_time_between_trades()).unwrap_or_default(),
        }
    }

    /// Records a completed trade's P&L. `counts_toward_daily_limit` is
    /// `false` for hedge/cut-loss orders — they still update
    /// pnl/consecutive-losses, just not the `max_trades_per_day` counter.
    pub fn record_trade(&self, net_pnl: Decimal, now: DateTime<Utc>, counts_toward_daily_limit: bool) {
        let mut agg = self.aggregates.lock();
        agg.today_net_pnl += net_pnl;
        agg.last_trade_time = Some(now);
        if counts_toward_daily_limit {
            agg.today_trade_count += 1;
            self.trade_count_hint.store(agg.today_trade_count, Ordering::SeqCst);
        }
        if net_pnl < Decimal::ZERO {
            agg.consecutive_losses += 1;
        } else {
            agg.consecutive_losses = 0;
        }
        if agg.consecutive_losses >= self.config.max_consecutive_losses {
            warn!(
                consecutive_losses = agg.consecutive_losses,
                max = self.config.max_consecutive_losses,
                "risk gate: consecutive loss limit reached"
            );
        }
    }

    #[must_use]
    pub fn today_net_pnl(&self) -> Decimal {
        self.aggregates.lock().today_net_pnl
    }

    #[must_use]
    pub fn today_trade_count(&self) -> u32 {
        self.aggregates.lock().today_trade_count
    }

    #[must_use]
    pub fn consecutive_losses(&self) -> u32 {
        self.aggregates.lock().consecutive_losses
    }
}
