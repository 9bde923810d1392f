//! The pair scheduler: the single cooperative main loop.
//!
//! A `loop { ... }` with a non-blocking `rx.try_recv()` command check per
//! iteration and per-cycle error containment, iterating every enabled pair
//! each tick. Config is held behind `arc_swap::ArcSwap` so a config reload
//! never blocks a poll in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arb_core::config::ArbConfig;
use arb_core::events::{ArbEvent, EngineStatus, EventBus};
use arb_core::types::{PairStatus, TradingPair, VenueId};
use arb_core::venue::{Clock, Venue};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::analyzer::{self, VenueBalances};
use crate::daily_pnl::DailyPnlTracker;
use crate::executor::Executor;
use crate::registry::PairRegistry;
use crate::risk_gate::{GateVerdict, RiskGate};

/// Operator controls delivered to a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    Stop,
    Pause,
    Resume,
}

/// How long a paused scheduler sleeps between checks for a `Resume`/`Stop`.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(200);

enum ControlFlow {
    Continue,
    Stop,
}

/// Drives every enabled pair in `registry` through fetch → analyze →
/// (risk-gate & cooldown) → execute, once per `config.strategy.polling_interval_ms`.
pub struct Scheduler {
    venue_a: Arc<dyn Venue>,
    venue_b: Arc<dyn Venue>,
    registry: Arc<PairRegistry>,
    executor: Executor,
    risk_gate: Arc<RiskGate>,
    daily_pnl: Arc<DailyPnlTracker>,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    config: ArcSwap<ArbConfig>,
    command_rx: Mutex<mpsc::Receiver<SchedulerCommand>>,
    paused: AtomicBool,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        venue_a: Arc<dyn Venue>,
        venue_b: Arc<dyn Venue>,
        registry: Arc<PairRegistry>,
        risk_gate: Arc<RiskGate>,
        daily_pnl: Arc<DailyPnlTracker>,
        event_bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        config: ArbConfig,
    ) -> (Self, mpsc::Sender<SchedulerCommand>) {
        let (tx, rx) = mpsc::channel(16);
        let executor = Executor::new(venue_a.clone(), venue_b.clone(), clock.clone());
        let scheduler = Self {
            venue_a,
            venue_b,
            registry,
            executor,
            risk_gate,
            daily_pnl,
            event_bus,
            clock,
            config: ArcSwap::from_pointee(config),
            command_rx: Mutex::new(rx),
            paused: AtomicBool::new(false),
        };
        (scheduler, tx)
    }

    /// Publishes a new config snapshot; in-flight polls keep using the
    /// snapshot they already loaded, the next poll picks up the new one.
    pub fn reload_config(&self, config: ArbConfig) {
        self.config.store(Arc::new(config));
    }

    /// Runs until a `Stop` command is received or the risk gate issues a
    /// hard stop. Returns the terminal `EngineStatus`.
    pub async fn run(&self) -> EngineStatus {
        self.event_bus.publish(&ArbEvent::StatusChanged { status: EngineStatus::Running, message: None });

        loop {
            let today = self.clock.now().date_naive();
            self.risk_gate.reset_if_new_day(today);
            self.daily_pnl.reset_if_new_day(today);

            if let GateVerdict::Stop(stop) = self.risk_gate.check() {
                let message = format!("risk gate stop: {stop:?}");
                warn!(%message, "scheduler stopping");
                self.event_bus.publish(&ArbEvent::StatusChanged {
                    status: EngineStatus::StoppedByRiskLimit,
                    message: Some(message),
                });
                return EngineStatus::StoppedByRiskLimit;
            }

            if matches!(self.drain_commands(), ControlFlow::Stop) {
                self.event_bus.publish(&ArbEvent::StatusChanged { status: EngineStatus::Idle, message: None });
                return EngineStatus::Idle;
            }

            let config = self.config.load_full();

            for symbol in self.registry.symbols() {
                if matches!(self.drain_commands(), ControlFlow::Stop) {
                    self.event_bus.publish(&ArbEvent::StatusChanged { status: EngineStatus::Idle, message: None });
                    return EngineStatus::Idle;
                }
                if self.paused.load(Ordering::SeqCst) {
                    tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
                    continue;
                }

                let Some(pair_handle) = self.registry.get(&symbol) else { continue };
                let enabled = pair_handle.lock().enabled;
                if !enabled {
                    continue;
                }

                self.poll_pair(&pair_handle, &config).await;
            }

            tokio::time::sleep(config.strategy.polling_interval()).await;
        }
    }

    fn drain_commands(&self) -> ControlFlow {
        let mut rx = self.command_rx.lock();
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                SchedulerCommand::Stop => return ControlFlow::Stop,
                SchedulerCommand::Pause => self.paused.store(true, Ordering::SeqCst),
                SchedulerCommand::Resume => self.paused.store(false, Ordering::SeqCst),
            }
        }
        ControlFlow::Continue
    }

    async fn poll_pair(&self, pair_handle: &Arc<Mutex<TradingPair>>, config: &ArbConfig) {
        let (symbol, venue_a_symbol, venue_b_symbol, base, quote) = {
            let pair = pair_handle.lock();
            (pair.symbol.clone(), pair.venue_a_symbol.clone(), pair.venue_b_symbol.clone(), pair.base.clone(), pair.quote.clone())
        };

        let (ticker_a, ticker_b, balance_a, balance_b) = tokio::join!(
            self.venue_a.get_ticker(&venue_a_symbol),
            self.venue_b.get_ticker(&venue_b_symbol),
            self.venue_a.get_balance(),
            self.venue_b.get_balance()
        );
        let balances = VenueBalances::new(balance_a.unwrap_or_default(), balance_b.unwrap_or_default());

        {
            let mut pair = pair_handle.lock();
            match &ticker_a {
                Ok(ticker) => {
                    self.event_bus.publish(&ArbEvent::PriceUpdated {
                        venue: VenueId::A,
                        symbol: symbol.clone(),
                        ticker: ticker.clone(),
                    });
                    pair.last_ticker_a = Some(ticker.clone());
                }
                Err(err) => warn!(venue = "A", %symbol, %err, "ticker fetch failed"),
            }
            match &ticker_b {
                Ok(ticker) => {
                    self.event_bus.publish(&ArbEvent::PriceUpdated {
                        venue: VenueId::B,
                        symbol: symbol.clone(),
                        ticker: ticker.clone(),
                    });
                    pair.last_ticker_b = Some(ticker.clone());
                }
                Err(err) => warn!(venue = "B", %symbol, %err, "ticker fetch failed"),
            }
        }

        let opportunity = {
            let pair = pair_handle.lock();
            analyzer::analyze(
                &pair,
                &config.strategy,
                config.exchange_a.trading_fee_percent,
                config.exchange_b.trading_fee_percent,
                config.risk.max_position_size_per_trade,
                &balances,
            )
        };

        pair_handle.lock().current_opportunity = Some(opportunity.clone());

        if opportunity.should_trade {
            self.event_bus
                .publish(&ArbEvent::OpportunityFound { opportunity: opportunity.clone(), pair_symbol: symbol.clone() });

            let now = self.clock.now();
            if self.risk_gate.cooldown_ok(now) {
                set_status(pair_handle, PairStatus::Trading);

                let buy_venue_id = opportunity.direction.buy_venue().expect("should_trade implies a direction");
                let (buy_symbol, sell_symbol) = match buy_venue_id {
                    VenueId::A => (venue_a_symbol.as_str(), venue_b_symbol.as_str()),
                    VenueId::B => (venue_b_symbol.as_str(), venue_a_symbol.as_str()),
                };

                let result = self.executor.execute(&opportunity, &config.strategy, buy_symbol, sell_symbol, &base, &quote).await;
                info!(%symbol, status = ?result.status, net_pnl = %result.net_pnl, "trade completed");

                self.event_bus.publish(&ArbEvent::TradeCompleted { result: result.clone() });
                // One `TradeResult` is one trade attempt regardless of any
                // internal hedge recovery, so it always counts toward the
                // daily trade limit; a hedge recorded as its own, separate
                // trade would be the case for `counts_toward_daily_limit =
                // false`, which this executor design does not produce.
                self.risk_gate.record_trade(result.net_pnl, now, true);

                let mut pair = pair_handle.lock();
                pair.today_trade_count += 1;
                pair.today_pnl += result.net_pnl;
                drop(pair);

                set_status(pair_handle, PairStatus::Idle);
            }
        } else {
            let status = if opportunity.has_positive_net_spread() { PairStatus::Opportunity } else { PairStatus::Idle };
            set_status(pair_handle, status);
        }
    }
}

fn set_status(pair_handle: &Arc<Mutex<TradingPair>>, status: PairStatus) {
    pair_handle.lock().status = status;
}
