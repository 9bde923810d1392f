//! The two-leg trade executor.
//!
//! Places both legs concurrently via `tokio::join!` and falls back to a
//! one-sided-failure recovery path when only one leg fills, generalized to
//! two abstract venues `A`/`B`. Cancellation of the executor's own future is
//! the only way `execute` fails to return a `TradeResult` — every other
//! condition (leg rejection, hedge failure, timeout) is folded into the
//! result instead of propagated as an error: the public entry point never
//! throws.

use std::sync::Arc;
use std::time::Duration;

use arb_core::config::{OneSideFailStrategy, OrderTypeConfig, PartialFillStrategy, StrategyConfig};
use arb_core::error::VenueError;
use arb_core::types::{Order, OrderRequest, OrderStatus, Side, SpreadOpportunity, TradeResult, TradeStatus, VenueId};
use arb_core::venue::{Clock, Venue};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Places both legs of a `SpreadOpportunity` and classifies the outcome.
/// One instance is shared across all pairs; it is stateless beyond its
/// venue handles.
pub struct Executor {
    venue_a: Arc<dyn Venue>,
    venue_b: Arc<dyn Venue>,
    clock: Arc<dyn Clock>,
}

impl Executor {
    #[must_use]
    pub fn new(venue_a: Arc<dyn Venue>, venue_b: Arc<dyn Venue>, clock: Arc<dyn Clock>) -> Self {
        Self { venue_a, venue_b, clock }
    }

    fn venue(&self, id: VenueId) -> &Arc<dyn Venue> {
        match id {
            VenueId::A => &self.venue_a,
            VenueId::B => &self.venue_b,
        }
    }

    /// Executes `opportunity`. `buy_symbol`/`sell_symbol` are the
    /// venue-native wire symbols for the buy/sell legs respectively (a
    /// pair's `venue_a_symbol`/`venue_b_symbol`, picked by the caller
    /// according to `opportunity.direction`). `base`/`quote` are the pair's
    /// asset symbols, used only for the pre-placement balance re-check.
    ///
    /// Re-verifies `has_balance` with a fresh `get_asset_balance` call
    /// immediately before placing either leg rather than trusting the
    /// analyzer's (possibly cooldown-stale) snapshot; on insufficient
    /// balance, returns a `Cancelled` result without placing anything.
    pub async fn execute(
        &self,
        opportunity: &SpreadOpportunity,
        strategy: &StrategyConfig,
        buy_symbol: &str,
        sell_symbol: &str,
        base: &str,
        quote: &str,
    ) -> TradeResult {
        let start = self.clock.now();
        let Some(buy_venue_id) = opportunity.direction.buy_venue() else {
            return error_result(opportunity, start, self.clock.now(), "opportunity has no direction".to_string());
        };
        let sell_venue_id = buy_venue_id.other();

        if !self.has_sufficient_balance(opportunity, buy_venue_id, sell_venue_id, base, quote).await {
            return cancelled_result(opportunity, start, self.clock.now(), "insufficient balance at execution time".to_string());
        }

        let buy_request = build_request(strategy, Side::Buy, buy_symbol, opportunity.suggested_qty, opportunity.buy_price);
        let sell_request =
            build_request(strategy, Side::Sell, sell_symbol, opportunity.suggested_qty, opportunity.sell_price);

        let buy_venue = self.venue(buy_venue_id).clone();
        let sell_venue = self.venue(sell_venue_id).clone();

        let (buy_outcome, sell_outcome) =
            tokio::join!(buy_venue.place_order(&buy_request), sell_venue.place_order(&sell_request));

        let mut notes = Vec::new();
        let mut errors = Vec::new();

        let (status, buy_order, sell_order) = match (buy_outcome, sell_outcome) {
            (Ok(buy), Ok(sell)) if buy.status == OrderStatus::Filled && sell.status == OrderStatus::Filled => {
                (TradeStatus::Success, Some(buy), Some(sell))
            }
            (Ok(buy), Ok(sell)) => {
                notes.push("one or both legs partially filled".to_string());
                let (status, buy, sell) = self
                    .resolve_partial(strategy, buy_venue_id, sell_venue_id, buy_symbol, sell_symbol, buy, sell, &mut notes, &mut errors)
                    .await;
                (status, Some(buy), Some(sell))
            }
            (Err(buy_err), Err(sell_err)) => {
                errors.push(format!("buy leg failed: {buy_err}"));
                errors.push(format!("sell leg failed: {sell_err}"));
                (TradeStatus::BothFailed, None, None)
            }
            (Ok(buy), Err(sell_err)) => {
                errors.push(format!("sell leg failed: {sell_err}"));
                let hedge = self
                    .recover_one_sided(strategy, sell_venue_id, sell_symbol, Side::Buy, buy.filled_qty, &mut notes, &mut errors)
                    .await;
                (TradeStatus::OneSideFailed, Some(buy), hedge)
            }
            (Err(buy_err), Ok(sell)) => {
                errors.push(format!("buy leg failed: {buy_err}"));
                let hedge = self
                    .recover_one_sided(strategy, buy_venue_id, buy_symbol, Side::Sell, sell.filled_qty, &mut notes, &mut errors)
                    .await;
                (TradeStatus::OneSideFailed, hedge, Some(sell))
            }
        };

        let end = self.clock.now();
        let (gross_pnl, fees) = settle_pnl(&buy_order, &sell_order);
        let net_pnl = gross_pnl - fees;

        TradeResult {
            trade_id: Uuid::new_v4(),
            symbol: opportunity.symbol.clone(),
            direction: opportunity.direction,
            status,
            buy_order,
            sell_order,
            net_pnl,
            fees,
            start,
            end,
            notes,
            errors,
        }
    }

    /// `one_side_fail_strategy` recovery: re-places the failed leg as a
    /// market order on its original venue, sized to the successful leg's
    /// actual fill, to flatten inventory. `Hedge` and `CutLoss` apply the
    /// identical action and differ only in the label attached to the
    /// trade's notes.
    async fn recover_one_sided(
        &self,
        strategy: &StrategyConfig,
        failed_venue_id: VenueId,
        failed_symbol: &str,
        failed_side: Side,
        flatten_qty: Decimal,
        notes: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) -> Option<Order> {
        match strategy.one_side_fail_strategy {
            OneSideFailStrategy::DoNothing => {
                notes.push("one_side_fail_strategy=DoNothing: no compensating action taken".to_string());
                None
            }
            strategy_kind @ (OneSideFailStrategy::Hedge | OneSideFailStrategy::CutLoss) => {
                if flatten_qty <= Decimal::ZERO {
                    notes.push("successful leg had zero fill, nothing to flatten".to_string());
                    return None;
                }
                let label = if matches!(strategy_kind, OneSideFailStrategy::Hedge) { "hedge" } else { "cut-loss" };
                let request = OrderRequest::market(failed_symbol, failed_side, flatten_qty);
                match self.venue(failed_venue_id).place_order(&request).await {
                    Ok(order) => {
                        notes.push(format!("{label} order placed on {failed_venue_id} to flatten {flatten_qty}"));
                        Some(order)
                    }
                    Err(err) => {
                        warn!(venue = %failed_venue_id, %err, "{label} order failed");
                        errors.push(format!("{label} order failed: {err}"));
                        None
                    }
                }
            }
        }
    }

    /// `partial_fill_strategy` resolution, invoked when both legs returned
    /// `Ok` but at least one is not fully `Filled`.
    async fn resolve_partial(
        &self,
        strategy: &StrategyConfig,
        buy_venue_id: VenueId,
        sell_venue_id: VenueId,
        buy_symbol: &str,
        sell_symbol: &str,
        mut buy: Order,
        mut sell: Order,
        notes: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) -> (TradeStatus, Order, Order) {
        match strategy.partial_fill_strategy {
            PartialFillStrategy::WaitMore => self.wait_more(strategy, buy_venue_id, sell_venue_id, buy_symbol, sell_symbol, buy, sell, notes).await,
            PartialFillStrategy::Hedge => {
                let (buy, sell) = self.hedge_partial(buy_venue_id, sell_venue_id, buy_symbol, sell_symbol, buy, sell, notes, errors).await;
                (TradeStatus::PartialSuccess, buy, sell)
            }
            PartialFillStrategy::CancelRemaining => {
                self.cancel_if_open(buy_venue_id, &mut buy, errors).await;
                self.cancel_if_open(sell_venue_id, &mut sell, errors).await;
                (TradeStatus::PartialSuccess, buy, sell)
            }
        }
    }

    /// Polls both legs until both reach `Filled` or `order_fill_timeout_ms`
    /// elapses; on timeout, cancels whatever is still open.
    async fn wait_more(
        &self,
        strategy: &StrategyConfig,
        buy_venue_id: VenueId,
        sell_venue_id: VenueId,
        buy_symbol: &str,
        sell_symbol: &str,
        mut buy: Order,
        mut sell: Order,
        notes: &mut Vec<String>,
    ) -> (TradeStatus, Order, Order) {
        const POLL_INTERVAL: Duration = Duration::from_millis(500);
        let deadline = tokio::time::Instant::now() + strategy.order_fill_timeout();

        while tokio::time::Instant::now() < deadline {
            if buy.status == OrderStatus::Filled && sell.status == OrderStatus::Filled {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            if buy.status != OrderStatus::Filled {
                if let Ok(refreshed) = self.venue(buy_venue_id).get_order(buy_symbol, &buy.order_id).await {
                    buy = refreshed;
                }
            }
            if sell.status != OrderStatus::Filled {
                if let Ok(refreshed) = self.venue(sell_venue_id).get_order(sell_symbol, &sell.order_id).await {
                    sell = refreshed;
                }
            }
        }

        if buy.status == OrderStatus::Filled && sell.status == OrderStatus::Filled {
            notes.push("WaitMore: both legs reached Filled before timeout".to_string());
            return (TradeStatus::Success, buy, sell);
        }

        notes.push("WaitMore: timed out waiting for fill, cancelling remainder".to_string());
        let mut errors = Vec::new();
        self.cancel_if_open(buy_venue_id, &mut buy, &mut errors).await;
        self.cancel_if_open(sell_venue_id, &mut sell, &mut errors).await;
        (TradeStatus::PartialSuccess, buy, sell)
    }

    /// Sizes a flattening market order for `|buy_filled - sell_filled|` on
    /// whichever side is under-filled, leaving the other leg's remainder to
    /// a subsequent cancel.
    async fn hedge_partial(
        &self,
        buy_venue_id: VenueId,
        sell_venue_id: VenueId,
        buy_symbol: &str,
        sell_symbol: &str,
        buy: Order,
        sell: Order,
        notes: &mut Vec<String>,
        errors: &mut Vec<String>,
    ) -> (Order, Order) {
        let diff = buy.filled_qty - sell.filled_qty;
        if diff == Decimal::ZERO {
            notes.push("both legs filled equally, no hedge needed".to_string());
            return (buy, sell);
        }
        if diff > Decimal::ZERO {
            // Bought more than sold: sell the difference to flatten.
            let request = OrderRequest::market(sell_symbol, Side::Sell, diff);
            match self.venue(sell_venue_id).place_order(&request).await {
                Ok(_) => notes.push(format!("hedged {diff} on sell venue to match buy fill")),
                Err(err) => errors.push(format!("partial-fill hedge failed: {err}")),
            }
        } else {
            let request = OrderRequest::market(buy_symbol, Side::Buy, -diff);
            match self.venue(buy_venue_id).place_order(&request).await {
                Ok(_) => notes.push(format!("hedged {} on buy venue to match sell fill", -diff)),
                Err(err) => errors.push(format!("partial-fill hedge failed: {err}")),
            }
        }
        (buy, sell)
    }

    /// Fresh balance check against the buy venue's quote asset (funds to pay
    /// for the buy leg) and the sell venue's base asset (inventory to sell),
    /// each padded by the same 1% safety factor the analyzer applies.
    async fn has_sufficient_balance(
        &self,
        opportunity: &SpreadOpportunity,
        buy_venue_id: VenueId,
        sell_venue_id: VenueId,
        base: &str,
        quote: &str,
    ) -> bool {
        let required_quote = opportunity.suggested_qty * opportunity.buy_price * dec!(1.01);
        let required_base = opportunity.suggested_qty * dec!(1.01);

        let (quote_balance, base_balance) =
            tokio::join!(self.venue(buy_venue_id).get_asset_balance(quote), self.venue(sell_venue_id).get_asset_balance(base));

        match (quote_balance, base_balance) {
            (Ok(quote_balance), Ok(base_balance)) => {
                quote_balance.available >= required_quote && base_balance.available >= required_base
            }
            (Err(err), _) => {
                debug!(venue = %buy_venue_id, asset = %quote, %err, "balance re-check failed");
                false
            }
            (_, Err(err)) => {
                debug!(venue = %sell_venue_id, asset = %base, %err, "balance re-check failed");
                false
            }
        }
    }

    /// Cancels `order` if still open, updating its `status` to `Cancelled`
    /// on success so the caller's returned `Order` reflects what actually
    /// happened instead of the stale pre-cancel snapshot.
    async fn cancel_if_open(&self, venue_id: VenueId, order: &mut Order, errors: &mut Vec<String>) {
        if !order.status.is_open() {
            return;
        }
        match self.venue(venue_id).cancel_order(&order.symbol, &order.order_id).await {
            Ok(()) => order.status = OrderStatus::Cancelled,
            Err(err) => {
                debug!(venue = %venue_id, order_id = %order.order_id, %err, "cancel of remaining leg failed");
                errors.push(format!("cancel failed on {venue_id}: {err}"));
            }
        }
    }
}

fn build_request(strategy: &StrategyConfig, side: Side, symbol: &str, qty: Decimal, reference_price: Decimal) -> OrderRequest {
    match strategy.order_type {
        OrderTypeConfig::Market => OrderRequest::market(symbol, side, qty),
        OrderTypeConfig::Limit => {
            let slippage = strategy.limit_order_slippage_pct / dec!(100);
            let price = match side {
                Side::Buy => reference_price * (Decimal::ONE + slippage),
                Side::Sell => reference_price * (Decimal::ONE - slippage),
            };
            OrderRequest::limit(symbol, side, qty, price)
        }
    }
}

/// `gross_pnl = sell fill value - buy fill value`, `fees = sum of both legs'
/// recorded fees`. Missing legs contribute zero on both sides, which is
/// correct for `BothFailed`.
fn settle_pnl(buy: &Option<Order>, sell: &Option<Order>) -> (Decimal, Decimal) {
    let buy_value = buy.as_ref().map_or(Decimal::ZERO, Order::fill_value);
    let sell_value = sell.as_ref().map_or(Decimal::ZERO, Order::fill_value);
    let fees = buy.as_ref().map_or(Decimal::ZERO, |o| o.fee) + sell.as_ref().map_or(Decimal::ZERO, |o| o.fee);
    (sell_value - buy_value, fees)
}

fn cancelled_result(
    opportunity: &SpreadOpportunity,
    start: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
    message: String,
) -> TradeResult {
    TradeResult {
        trade_id: Uuid::new_v4(),
        symbol: opportunity.symbol.clone(),
        direction: opportunity.direction,
        status: TradeStatus::Cancelled,
        buy_order: None,
        sell_order: None,
        net_pnl: Decimal::ZERO,
        fees: Decimal::ZERO,
        start,
        end,
        notes: vec![message],
        errors: Vec::new(),
    }
}

fn error_result(
    opportunity: &SpreadOpportunity,
    start: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
    message: String,
) -> TradeResult {
    error!(symbol = %opportunity.symbol, %message, "executor called with an unexecutable opportunity");
    TradeResult {
        trade_id: Uuid::new_v4(),
        symbol: opportunity.symbol.clone(),
        direction: opportunity.direction,
        status: TradeStatus::Error,
        buy_order: None,
        sell_order: None,
        net_pnl: Decimal::ZERO,
        fees: Decimal::ZERO,
        start,
        end,
        notes: Vec::new(),
        errors: vec![message],
    }
}
