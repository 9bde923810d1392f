//! End-to-end tests driving the public `ArbEngine` API against
//! `venue_mock::MockVenue`, one per seed scenario: happy-path/below-threshold
//! spread detection, insufficient liquidity, one-leg-fail hedging, partial
//! fill cancellation, a daily-loss risk stop, and a drawdown emergency.

use std::sync::Arc;
use std::time::Duration;

use arb_core::config::{
    ArbConfig, ExchangeConfig, OneSideFailStrategy, OrderTypeConfig, PartialFillStrategy, RiskConfig, StrategyConfig,
};
use arb_core::events::{ArbEvent, EmergencyAction, EmergencyReason, EngineStatus, EventSubscriber};
use arb_core::oracle::StaticPriceOracle;
use arb_core::types::{Balance, TradeStatus, VenueId};
use arb_core::venue::{SystemClock, Venue};
use arb_engine::ArbEngine;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use venue_mock::{MockVenue, PlacementScript};

fn exchange(name: &str) -> ExchangeConfig {
    ExchangeConfig {
        name: name.to_string(),
        api_base_url: format!("https://{name}.example"),
        api_key_env: format!("{name}_KEY"),
        api_secret_env: format!("{name}_SECRET"),
        passphrase_env: None,
        trading_fee_percent: dec!(0.1),
        rate_limit_per_second: 10,
        timeout_ms: 5000,
        max_retries: 3,
        is_enabled: true,
    }
}

fn config(polling_interval_ms: u64, partial_fill_strategy: PartialFillStrategy, one_side_fail_strategy: OneSideFailStrategy) -> ArbConfig {
    ArbConfig {
        exchange_a: exchange("A"),
        exchange_b: exchange("B"),
        strategy: StrategyConfig {
            min_spread_percentage: dec!(0.3),
            min_expected_profit_quote: dec!(0.5),
            polling_interval_ms,
            order_type: OrderTypeConfig::Market,
            limit_order_slippage_pct: dec!(0.05),
            order_fill_timeout_ms: 500,
            partial_fill_strategy,
            one_side_fail_strategy,
            min_depth_qty: dec!(0.01),
        },
        risk: RiskConfig {
            max_position_size_per_trade: dec!(1_000_000),
            max_daily_loss: dec!(50),
            max_trades_per_day: 1000,
            min_time_between_trades_ms: 0,
            max_consecutive_losses: 10,
            max_drawdown_percent: dec!(5),
            rebalance_threshold_percent: dec!(30),
        },
        trading_pairs: vec!["BTC/USDT".to_string()],
    }
}

fn ample_balances(venue: &MockVenue) {
    venue.set_balance("USDT", Balance { total: dec!(1_000_000), available: dec!(1_000_000) });
    venue.set_balance("BTC", Balance { total: dec!(1_000), available: dec!(1_000) });
}

fn oracle() -> Arc<StaticPriceOracle> {
    Arc::new(StaticPriceOracle::new().with_price("USDT", dec!(1)).with_price("BTC", dec!(1)))
}

/// Collects every published event for post-hoc assertion.
struct RecordingSubscriber {
    events: Mutex<Vec<ArbEvent>>,
}

impl RecordingSubscriber {
    fn new() -> Self {
        Self { events: Mutex::new(Vec::new()) }
    }

    fn snapshot(&self) -> Vec<ArbEvent> {
        self.events.lock().clone()
    }
}

impl EventSubscriber for RecordingSubscriber {
    fn on_event(&self, event: &ArbEvent) {
        self.events.lock().push(event.clone());
    }
}

// ============================================================================
// Scenario 1: happy-path arb / below-threshold spread
// ============================================================================

#[tokio::test]
async fn below_threshold_spread_does_not_trade() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    ample_balances(&venue_a);
    ample_balances(&venue_b);
    venue_a.set_ticker("BTCUSDT", ticker(dec!(41990), dec!(1), dec!(42000), dec!(1)));
    // B bid 42200: gross spread ~0.476%, net ~0.276% - below the 0.3% minimum.
    venue_b.set_ticker("BTCUSDT", ticker(dec!(42200), dec!(1), dec!(42210), dec!(1)));

    let config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );

    run_briefly(&engine).await;

    let pair = engine.registry().get("BTC/USDT").unwrap();
    let opportunity = pair.lock().current_opportunity.clone().unwrap();
    assert!(!opportunity.should_trade);
    assert!(opportunity.meets_min_profit);
    assert!(!opportunity.meets_min_spread);
}

#[tokio::test]
async fn above_threshold_spread_produces_a_tradeable_opportunity() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    ample_balances(&venue_a);
    ample_balances(&venue_b);
    venue_a.set_ticker("BTCUSDT", ticker(dec!(41990), dec!(1), dec!(42000), dec!(1)));
    // B bid 42300: gross spread ~0.714%, net ~0.514% - above the 0.3% minimum.
    venue_b.set_ticker("BTCUSDT", ticker(dec!(42300), dec!(1), dec!(42310), dec!(1)));

    let config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );

    let subscriber = Arc::new(RecordingSubscriber::new());
    engine.event_bus().subscribe(subscriber.clone());

    run_briefly(&engine).await;

    let pair = engine.registry().get("BTC/USDT").unwrap();
    let opportunity = pair.lock().current_opportunity.clone().unwrap();
    assert!(opportunity.should_trade);
    assert_eq!(opportunity.suggested_qty, dec!(1));

    let traded = subscriber.snapshot().into_iter().any(|e| matches!(e, ArbEvent::TradeCompleted { result } if result.status == TradeStatus::Success));
    assert!(traded, "a trade should have completed once the spread cleared the threshold");
}

// ============================================================================
// Scenario 2: insufficient liquidity
// ============================================================================

#[tokio::test]
async fn insufficient_depth_blocks_the_trade_despite_a_wide_spread() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    ample_balances(&venue_a);
    ample_balances(&venue_b);
    venue_a.set_ticker("BTCUSDT", ticker(dec!(41990), dec!(1), dec!(42000), dec!(1)));
    // Wide spread, but only 0.001 BTC on B's bid - below min_depth_qty (0.01).
    venue_b.set_ticker("BTCUSDT", ticker(dec!(42300), dec!(0.001), dec!(42310), dec!(1)));

    let config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );

    run_briefly(&engine).await;

    let pair = engine.registry().get("BTC/USDT").unwrap();
    let opportunity = pair.lock().current_opportunity.clone().unwrap();
    assert!(!opportunity.should_trade);
    assert!(!opportunity.has_liquidity);
    assert!(opportunity.remarks.iter().any(|r| r.contains("Insufficient liquidity")));
}

// ============================================================================
// Scenario 3: one-leg fail, Hedge strategy
// ============================================================================

#[tokio::test]
async fn one_leg_timeout_hedges_and_reports_one_side_failed() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    ample_balances(&venue_a);
    ample_balances(&venue_b);
    venue_a.set_ticker("BTCUSDT", ticker(dec!(41990), dec!(1), dec!(42000), dec!(1)));
    venue_b.set_ticker("BTCUSDT", ticker(dec!(42300), dec!(1), dec!(42310), dec!(1)));
    // Direction is BuyA_SellB; the sell leg (B) times out.
    venue_b.queue_placement(PlacementScript::Timeout("no response".to_string()));

    let config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );
    let subscriber = Arc::new(RecordingSubscriber::new());
    engine.event_bus().subscribe(subscriber.clone());

    run_briefly(&engine).await;

    let trade = subscriber
        .snapshot()
        .into_iter()
        .find_map(|e| match e {
            ArbEvent::TradeCompleted { result } => Some(result),
            _ => None,
        })
        .expect("a trade attempt should have completed");
    assert_eq!(trade.status, TradeStatus::OneSideFailed);
    assert!(trade.notes.iter().any(|n| n.contains("hedge")));
}

// ============================================================================
// Scenario 4: partial fill, CancelRemaining strategy
// ============================================================================

#[tokio::test]
async fn partial_fill_cancels_the_remaining_leg() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    ample_balances(&venue_a);
    ample_balances(&venue_b);
    venue_a.set_ticker("BTCUSDT", ticker(dec!(41990), dec!(1), dec!(42000), dec!(1)));
    venue_b.set_ticker("BTCUSDT", ticker(dec!(42300), dec!(1), dec!(42310), dec!(1)));
    // Buy leg (A) only partially fills.
    venue_a.queue_placement(PlacementScript::PartialFill(dec!(0.05)));

    let config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );
    let subscriber = Arc::new(RecordingSubscriber::new());
    engine.event_bus().subscribe(subscriber.clone());

    run_briefly(&engine).await;

    let trade = subscriber
        .snapshot()
        .into_iter()
        .find_map(|e| match e {
            ArbEvent::TradeCompleted { result } => Some(result),
            _ => None,
        })
        .expect("a trade attempt should have completed");
    assert_eq!(trade.status, TradeStatus::PartialSuccess);
    let buy_order = trade.buy_order.expect("partially filled buy leg should still be reported");
    assert_eq!(buy_order.status, arb_core::types::OrderStatus::Cancelled);
}

// ============================================================================
// Scenario 5: risk stop on daily loss
// ============================================================================

#[tokio::test]
async fn daily_loss_limit_stops_the_engine() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    ample_balances(&venue_a);
    ample_balances(&venue_b);

    // No trading pairs: isolates the risk-gate-stop to engine-status wiring
    // from the executor's P&L arithmetic.
    let mut config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    config.trading_pairs.clear();
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );

    let now = arb_core::venue::Clock::now(&SystemClock);
    engine.risk_gate().record_trade(dec!(-49.9), now, true);
    engine.risk_gate().record_trade(dec!(-0.2), now, true);

    let status = tokio::time::timeout(Duration::from_secs(2), engine.run()).await.expect("engine should stop promptly");
    assert_eq!(status, EngineStatus::StoppedByRiskLimit);
}

// ============================================================================
// Scenario 6: drawdown emergency
// ============================================================================

#[tokio::test]
async fn drawdown_beyond_threshold_triggers_an_emergency_event() {
    let venue_a = Arc::new(MockVenue::new("A"));
    let venue_b = Arc::new(MockVenue::new("B"));
    venue_a.set_balance("USDT", Balance { total: dec!(10_000), available: dec!(10_000) });
    venue_b.set_balance("USDT", Balance { total: dec!(0), available: dec!(0) });

    let config = config(20, PartialFillStrategy::CancelRemaining, OneSideFailStrategy::Hedge);
    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle(), Arc::new(SystemClock))
            .await
            .unwrap(),
    );
    let subscriber = Arc::new(RecordingSubscriber::new());
    engine.event_bus().subscribe(subscriber.clone());

    let now = arb_core::venue::Clock::now(&SystemClock);
    // Peak rises to 10,500.
    venue_a.set_balance("USDT", Balance { total: dec!(10_500), available: dec!(10_500) });
    engine.refresh_balance_pool(&(venue_a.clone() as Arc<dyn Venue>), &(venue_b.clone() as Arc<dyn Venue>), now).await.unwrap();
    assert_eq!(engine.balance_pool().latest_snapshot().peak_value_quote, dec!(10_500));

    // Drops to 9,900: drawdown = (10500 - 9900) / 10500 * 100 ~= 5.71%, above
    // the 5% max_drawdown_percent.
    venue_a.set_balance("USDT", Balance { total: dec!(9_900), available: dec!(9_900) });
    engine.refresh_balance_pool(&(venue_a.clone() as Arc<dyn Venue>), &(venue_b.clone() as Arc<dyn Venue>), now).await.unwrap();

    let triggered = subscriber.snapshot().into_iter().find_map(|e| match e {
        ArbEvent::EmergencyTriggered { reason, recommended_action, .. } => Some((reason, recommended_action)),
        _ => None,
    });
    assert_eq!(triggered, Some((EmergencyReason::MaxDrawdown, EmergencyAction::StopTrading)));
}

// ============================================================================
// Shared helpers
// ============================================================================

fn ticker(bid: rust_decimal::Decimal, bid_qty: rust_decimal::Decimal, ask: rust_decimal::Decimal, ask_qty: rust_decimal::Decimal) -> arb_core::types::Ticker {
    arb_core::types::Ticker {
        symbol: "BTCUSDT".to_string(),
        bid_price: bid,
        bid_qty,
        ask_price: ask,
        ask_qty,
        last_price: ask,
        ts: chrono::Utc::now(),
    }
}

/// Runs the engine in the background for a few poll cycles, then stops it
/// and waits for the run loop to exit.
async fn run_briefly(engine: &Arc<ArbEngine>) {
    let handle = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run().await })
    };
    tokio::time::sleep(Duration::from_millis(80)).await;
    engine.stop().await;
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
}
