//! Cross-exchange spot arbitrage engine: wires the analyzer, risk gate,
//! executor, scheduler, and balance pool built on top of `arb-core`'s
//! domain types into one `ArbEngine` facade sitting above the individual
//! trading-loop pieces.

pub mod analyzer;
pub mod balance_pool;
pub mod daily_pnl;
pub mod executor;
pub mod registry;
pub mod risk_gate;
pub mod scheduler;

use std::sync::Arc;

use arb_core::config::ArbConfig;
use arb_core::error::{ArbError, Result};
use arb_core::events::{ArbEvent, EngineStatus, EventBus, EventSubscriber};
use arb_core::oracle::PriceOracle;
use arb_core::venue::{Clock, Venue};

pub use balance_pool::BalancePool;
pub use daily_pnl::DailyPnlTracker;
pub use executor::Executor;
pub use registry::PairRegistry;
pub use risk_gate::RiskGate;
pub use scheduler::{Scheduler, SchedulerCommand};

/// Decimal places new pairs are registered with when no per-pair override
/// is configured. Venue connectors may report a tighter precision per
/// symbol; the engine core only needs a consistent default for rounding
/// suggested quantities down.
const DEFAULT_QTY_PRECISION: u32 = 8;

/// Forwards each completed trade's net P&L into the balance pool's
/// consecutive-loss/rapid-loss window, decoupling the scheduler from the
/// balance pool's internals via the event bus.
struct TradePnlFeeder {
    balance_pool: Arc<BalancePool>,
}

impl EventSubscriber for TradePnlFeeder {
    fn on_event(&self, event: &ArbEvent) {
        if let ArbEvent::TradeCompleted { result } = event {
            self.balance_pool.record_trade_pnl(result.net_pnl);
        }
    }
}

/// Top-level facade: owns the pair registry, risk gate, balance pool, and
/// scheduler for one engine instance trading one config across two venues.
pub struct ArbEngine {
    scheduler: Arc<Scheduler>,
    command_tx: tokio::sync::mpsc::Sender<SchedulerCommand>,
    registry: Arc<PairRegistry>,
    risk_gate: Arc<RiskGate>,
    balance_pool: Arc<BalancePool>,
    daily_pnl: Arc<DailyPnlTracker>,
    event_bus: Arc<EventBus>,
}

impl ArbEngine {
    /// Fetches both venues' initial balances, builds the pair registry from
    /// `config.trading_pairs`, and wires the scheduler. Does not start the
    /// main loop; call [`ArbEngine::run`] for that.
    pub async fn bootstrap(
        config: ArbConfig,
        venue_a: Arc<dyn Venue>,
        venue_b: Arc<dyn Venue>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let registry = Arc::new(
            PairRegistry::from_symbols(&config.trading_pairs, DEFAULT_QTY_PRECISION).map_err(ArbError::InvalidSymbol)?,
        );
        let risk_gate = Arc::new(RiskGate::new(config.risk.clone(), clock.now().date_naive()));
        let event_bus = Arc::new(EventBus::new());

        let balances_a = venue_a.get_balance().await?;
        let balances_b = venue_b.get_balance().await?;
        let balance_pool = Arc::new(BalancePool::initialize(
            oracle,
            config.risk.clone(),
            &balances_a,
            &balances_b,
            clock.now(),
        ));

        event_bus.subscribe(Arc::new(TradePnlFeeder { balance_pool: balance_pool.clone() }));

        let daily_pnl = Arc::new(DailyPnlTracker::new(clock.clone()));
        event_bus.subscribe(daily_pnl.clone());

        let (scheduler, command_tx) = Scheduler::new(
            venue_a,
            venue_b,
            registry.clone(),
            risk_gate.clone(),
            daily_pnl.clone(),
            event_bus.clone(),
            clock,
            config,
        );

        Ok(Self {
            scheduler: Arc::new(scheduler),
            command_tx,
            registry,
            risk_gate,
            balance_pool,
            daily_pnl,
            event_bus,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PairRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn risk_gate(&self) -> &Arc<RiskGate> {
        &self.risk_gate
    }

    #[must_use]
    pub fn balance_pool(&self) -> &Arc<BalancePool> {
        &self.balance_pool
    }

    #[must_use]
    pub fn daily_pnl(&self) -> &Arc<DailyPnlTracker> {
        &self.daily_pnl
    }

    #[must_use]
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Runs the main loop to completion (stop command or risk-gate hard
    /// stop). Intended to be awaited from its own task.
    pub async fn run(&self) -> EngineStatus {
        self.scheduler.run().await
    }

    pub async fn stop(&self) {
        let _ = self.command_tx.send(SchedulerCommand::Stop).await;
    }

    pub async fn pause(&self) {
        let _ = self.command_tx.send(SchedulerCommand::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.command_tx.send(SchedulerCommand::Resume).await;
    }

    /// Re-fetches both venues' balances and refreshes the balance pool.
    /// Intended to be called periodically from an independent task, separate
    /// from the main trading loop.
    pub async fn refresh_balance_pool(&self, venue_a: &Arc<dyn Venue>, venue_b: &Arc<dyn Venue>, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let balances_a = venue_a.get_balance().await?;
        let balances_b = venue_b.get_balance().await?;
        self.balance_pool.update(&balances_a, &balances_b, now);

        let snapshot = self.balance_pool.latest_snapshot();
        self.event_bus.publish(&ArbEvent::BalancePoolUpdated {
            total_value_quote: snapshot.total_value_quote,
            realized_pnl: self.balance_pool.realized_pnl(),
            realized_pnl_pct: self.balance_pool.realized_pnl_pct(),
            drawdown_pct: self.balance_pool.current_drawdown_pct(),
            per_asset: snapshot.per_asset,
        });

        let check = self.balance_pool.check_emergency();
        if check.should_trigger {
            if let (Some(reason), Some(action)) = (check.reason, check.action) {
                self.event_bus.publish(&ArbEvent::EmergencyTriggered {
                    reason,
                    message: format!("{reason:?} triggered {action:?}"),
                    current: check.current,
                    threshold: check.threshold,
                    recommended_action: action,
                });
            }
        }
        Ok(())
    }
}
