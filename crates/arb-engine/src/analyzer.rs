//! The opportunity analyzer.
//!
//! Pure and stateless: given a pair's latest tickers, the strategy/risk
//! config, and a balance lookup, produces a `SpreadOpportunity`. Never
//! touches a venue itself — callers fetch tickers/balances and pass them in,
//! keeping detection decoupled from any particular venue client.

use std::collections::HashMap;

use arb_core::config::StrategyConfig;
use arb_core::types::{Balance, Direction, SpreadOpportunity, Ticker, TradingPair, VenueId};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Resolves an available balance for `asset` on `venue`. Implementations
/// should return `None` on fetch failure (timeout, venue error) — the
/// analyzer treats that the same as an insufficient balance.
pub trait BalanceLookup {
    fn available(&self, venue: VenueId, asset: &str) -> Option<Decimal>;
}

/// A `BalanceLookup` with no known balances; used when balances could not
/// be fetched at all for this poll.
pub struct NoBalances;

impl BalanceLookup for NoBalances {
    fn available(&self, _venue: VenueId, _asset: &str) -> Option<Decimal> {
        None
    }
}

/// A `BalanceLookup` backed by one balance snapshot per venue, refreshed
/// by the caller each poll.
pub struct VenueBalances {
    a: HashMap<String, Balance>,
    b: HashMap<String, Balance>,
}

impl VenueBalances {
    #[must_use]
    pub fn new(a: HashMap<String, Balance>, b: HashMap<String, Balance>) -> Self {
        Self { a, b }
    }
}

impl BalanceLookup for VenueBalances {
    fn available(&self, venue: VenueId, asset: &str) -> Option<Decimal> {
        let balances = match venue {
            VenueId::A => &self.a,
            VenueId::B => &self.b,
        };
        balances.get(asset).map(|b| b.available)
    }
}

/// 1% buffer applied to required balance checks.
fn balance_safety_factor() -> Decimal {
    dec!(1.01)
}

/// Computes the `SpreadOpportunity` for `pair` given its currently stored
/// tickers. `fee_pct_a`/`fee_pct_b` are literal percentages (0.1 means
/// 0.1%), matching `ExchangeConfig::trading_fee_percent`.
#[must_use]
pub fn analyze(
    pair: &TradingPair,
    strategy: &StrategyConfig,
    fee_pct_a: Decimal,
    fee_pct_b: Decimal,
    max_position_quote: Decimal,
    balances: &dyn BalanceLookup,
) -> SpreadOpportunity {
    let (ticker_a, ticker_b) = match (&pair.last_ticker_a, &pair.last_ticker_b) {
        (Some(a), Some(b)) => (a, b),
        _ => return SpreadOpportunity::none(&pair.symbol, "Missing price data"),
    };

    let spread_buy_a_sell_b = spread_pct(ticker_a.ask_price, ticker_b.bid_price);
    let spread_buy_b_sell_a = spread_pct(ticker_b.ask_price, ticker_a.bid_price);

    if spread_buy_a_sell_b <= Decimal::ZERO && spread_buy_b_sell_a <= Decimal::ZERO {
        return SpreadOpportunity::none(&pair.symbol, "No positive gross spread either direction");
    }

    // Larger spread wins; ties resolve toward BuyA_SellB.
    let (direction, gross_spread_pct, buy_ticker, sell_ticker) =
        if spread_buy_a_sell_b >= spread_buy_b_sell_a {
            (Direction::BuyASellB, spread_buy_a_sell_b, ticker_a, ticker_b)
        } else {
            (Direction::BuyBSellA, spread_buy_b_sell_a, ticker_b, ticker_a)
        };

    let net_spread_pct = gross_spread_pct - (fee_pct_a + fee_pct_b);

    let buy_price = buy_ticker.ask_price;
    let sell_price = sell_ticker.bid_price;

    let position_cap_qty = if buy_price > Decimal::ZERO {
        max_position_quote / buy_price
    } else {
        Decimal::ZERO
    };
    let raw_qty = buy_ticker.ask_qty.min(sell_ticker.bid_qty).min(position_cap_qty);
    let suggested_qty = round_down(raw_qty, pair.qty_precision);

    let gross_profit_quote = suggested_qty * (sell_price - buy_price);
    let fees_quote =
        suggested_qty * buy_price * (fee_pct_a / dec!(100)) + suggested_qty * sell_price * (fee_pct_b / dec!(100));
    let expected_net_profit_quote = gross_profit_quote - fees_quote;

    let meets_min_spread = net_spread_pct >= strategy.min_spread_percentage;
    let meets_min_profit = expected_net_profit_quote >= strategy.min_expected_profit_quote;
    let has_liquidity = suggested_qty >= strategy.min_depth_qty;

    let buy_venue = direction.buy_venue().expect("direction is not None here");
    let sell_venue = direction.sell_venue().expect("direction is not None here");
    let required_quote = suggested_qty * buy_price * balance_safety_factor();
    let required_base = suggested_qty * balance_safety_factor();
    let quote_asset = &pair.quote;
    let base_asset = &pair.base;
    let available_quote = balances.available(buy_venue, quote_asset);
    let available_base = balances.available(sell_venue, base_asset);
    let has_balance = match (available_quote, available_base) {
        (Some(quote), Some(base)) => quote >= required_quote && base >= required_base,
        _ => false,
    };

    let has_positive_net_spread = net_spread_pct > Decimal::ZERO;
    let should_trade =
        has_positive_net_spread && meets_min_spread && meets_min_profit && has_liquidity && has_balance;

    let mut remarks = Vec::new();
    if !meets_min_spread {
        remarks.push(format!(
            "Net spread {net_spread_pct}% below minimum {}%",
            strategy.min_spread_percentage
        ));
    }
    if !meets_min_profit {
        remarks.push(format!(
            "Expected profit {expected_net_profit_quote} below minimum {}",
            strategy.min_expected_profit_quote
        ));
    }
    if !has_liquidity {
        remarks.push(format!("Insufficient liquidity: {suggested_qty} < {}", strategy.min_depth_qty));
    }
    if !has_balance {
        remarks.push("Insufficient balance for suggested size".to_string());
    }

    SpreadOpportunity {
        symbol: pair.symbol.clone(),
        direction,
        buy_price,
        buy_qty_available: buy_ticker.ask_qty,
        sell_price,
        sell_qty_available: sell_ticker.bid_qty,
        fee_pct_a,
        fee_pct_b,
        gross_spread_pct,
        net_spread_pct,
        suggested_qty,
        expected_net_profit_quote,
        meets_min_spread,
        meets_min_profit,
        has_liquidity,
        has_balance,
        should_trade,
        remarks,
    }
}

/// `(sell_price - buy_price) / buy_price * 100`, as a literal percentage.
/// Division by zero yields `0`.
fn spread_pct(buy_price: Decimal, sell_price: Decimal) -> Decimal {
    if buy_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (sell_price - buy_price) / buy_price * dec!(100)
}

/// Rounds `value` down to `precision` decimal places. Never rounds nearest:
/// over-rounding up would over-spend available balance/liquidity.
fn round_down(value: Decimal, precision: u32) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    value.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}
