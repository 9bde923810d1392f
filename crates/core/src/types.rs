//! Domain data model for the spot arbitrage engine.
//!
//! All monetary and quantity fields are `rust_decimal::Decimal`; floating
//! point is only used for derived display percentages, never for price or
//! quantity math.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one of the two configured venues a pair trades across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueId {
    A,
    B,
}

impl VenueId {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for VenueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Top-of-book snapshot for one symbol on one venue. Produced per poll, immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub bid_price: Decimal,
    pub bid_qty: Decimal,
    pub ask_price: Decimal,
    pub ask_qty: Decimal,
    pub last_price: Decimal,
    pub ts: DateTime<Utc>,
}

/// One level of a depth ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub qty: Decimal,
}

/// Depth ladder snapshot. Optional use by the analyzer; the core algorithm
/// only requires top-of-book (`Ticker`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub ts: DateTime<Utc>,
}

impl OrderBook {
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }
}

/// Lifecycle status of a registered trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairStatus {
    Idle,
    Opportunity,
    Trading,
    Disabled,
    Error,
}

/// A registered pair's mutable engine-side state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingPair {
    /// `"BASE/QUOTE"`, uppercase, slash-separated.
    pub symbol: String,
    pub base: String,
    pub quote: String,
    /// Wire symbol as venue A expects it (e.g. slash removed).
    pub venue_a_symbol: String,
    /// Wire symbol as venue B expects it.
    pub venue_b_symbol: String,
    pub enabled: bool,
    pub status: PairStatus,
    pub last_ticker_a: Option<Ticker>,
    pub last_ticker_b: Option<Ticker>,
    pub current_opportunity: Option<SpreadOpportunity>,
    pub today_trade_count: u32,
    pub today_pnl: Decimal,
    /// Decimal places the quantity is rounded down to.
    pub qty_precision: u32,
}

impl TradingPair {
    /// Builds a new pair in `Idle` status from a `"BASE/QUOTE"` symbol.
    ///
    /// # Errors
    /// Returns an error string if `symbol` is not `"BASE/QUOTE"` uppercase.
    pub fn new(symbol: impl Into<String>, qty_precision: u32) -> Result<Self, String> {
        let symbol = symbol.into();
        let (base, quote) = symbol
            .split_once('/')
            .ok_or_else(|| format!("pair symbol '{symbol}' is not in BASE/QUOTE form"))?;
        if base.is_empty() || quote.is_empty() {
            return Err(format!("pair symbol '{symbol}' has an empty base or quote"));
        }
        if symbol.to_uppercase() != symbol {
            return Err(format!("pair symbol '{symbol}' must be uppercase"));
        }
        let wire_symbol = format!("{base}{quote}");
        Ok(Self {
            symbol,
            base: base.to_string(),
            quote: quote.to_string(),
            venue_a_symbol: wire_symbol.clone(),
            venue_b_symbol: wire_symbol,
            enabled: true,
            status: PairStatus::Idle,
            last_ticker_a: None,
            last_ticker_b: None,
            current_opportunity: None,
            today_trade_count: 0,
            today_pnl: Decimal::ZERO,
            qty_precision,
        })
    }

    /// Resets the per-day counters. Called at the UTC day boundary.
    pub fn reset_daily_stats(&mut self) {
        self.today_trade_count = 0;
        self.today_pnl = Decimal::ZERO;
    }
}

/// Arbitrage direction a `SpreadOpportunity` recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Buy on venue A, sell on venue B.
    BuyASellB,
    /// Buy on venue B, sell on venue A.
    BuyBSellA,
    /// No profitable direction.
    None,
}

impl Direction {
    #[must_use]
    pub const fn buy_venue(self) -> Option<VenueId> {
        match self {
            Self::BuyASellB => Some(VenueId::A),
            Self::BuyBSellA => Some(VenueId::B),
            Self::None => None,
        }
    }

    #[must_use]
    pub const fn sell_venue(self) -> Option<VenueId> {
        match self {
            Self::BuyASellB => Some(VenueId::B),
            Self::BuyBSellA => Some(VenueId::A),
            Self::None => None,
        }
    }
}

/// A candidate trade computed per pair per poll. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadOpportunity {
    pub symbol: String,
    pub direction: Direction,
    pub buy_price: Decimal,
    pub buy_qty_available: Decimal,
    pub sell_price: Decimal,
    pub sell_qty_available: Decimal,
    pub fee_pct_a: Decimal,
    pub fee_pct_b: Decimal,
    /// Literal percentage: `0.3` means 0.3%, not 0.003.
    pub gross_spread_pct: Decimal,
    /// Literal percentage, fee-adjusted.
    pub net_spread_pct: Decimal,
    pub suggested_qty: Decimal,
    pub expected_net_profit_quote: Decimal,
    pub meets_min_spread: bool,
    pub meets_min_profit: bool,
    pub has_liquidity: bool,
    pub has_balance: bool,
    pub should_trade: bool,
    pub remarks: Vec<String>,
}

impl SpreadOpportunity {
    /// A spread opportunity with no viable direction; used when ticker data
    /// is missing or neither direction is profitable.
    #[must_use]
    pub fn none(symbol: impl Into<String>, remark: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            direction: Direction::None,
            buy_price: Decimal::ZERO,
            buy_qty_available: Decimal::ZERO,
            sell_price: Decimal::ZERO,
            sell_qty_available: Decimal::ZERO,
            fee_pct_a: Decimal::ZERO,
            fee_pct_b: Decimal::ZERO,
            gross_spread_pct: Decimal::ZERO,
            net_spread_pct: Decimal::ZERO,
            suggested_qty: Decimal::ZERO,
            expected_net_profit_quote: Decimal::ZERO,
            meets_min_spread: false,
            meets_min_profit: false,
            has_liquidity: false,
            has_balance: false,
            should_trade: false,
            remarks: vec![remark.into()],
        }
    }

    #[must_use]
    pub fn has_positive_net_spread(&self) -> bool {
        self.direction != Direction::None && self.net_spread_pct > Decimal::ZERO
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Order execution style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-kill.
    Fok,
}

/// Outbound order built by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

impl OrderRequest {
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
        }
    }

    #[must_use]
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
        }
    }
}

/// Venue-reported order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Expired,
    Error,
}

impl OrderStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired | Self::Error
        )
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::PartiallyFilled)
    }
}

/// Venue's view of a placed order, returned/updated by the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub status: OrderStatus,
    pub requested_qty: Decimal,
    pub filled_qty: Decimal,
    pub avg_filled_price: Decimal,
    pub fee: Decimal,
    pub fee_currency: String,
    pub ts: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn fill_value(&self) -> Decimal {
        self.filled_qty * self.avg_filled_price
    }

    #[must_use]
    pub fn is_fully_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

/// Outcome classification for a two-leg arbitrage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Success,
    PartialSuccess,
    OneSideFailed,
    BothFailed,
    Cancelled,
    Error,
}

/// Full record of one executed (or attempted) arbitrage trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    pub trade_id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    pub status: TradeStatus,
    pub buy_order: Option<Order>,
    pub sell_order: Option<Order>,
    pub net_pnl: Decimal,
    pub fees: Decimal,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Vec<String>,
    pub errors: Vec<String>,
}

impl TradeResult {
    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.net_pnl < Decimal::ZERO
    }
}

/// Per-UTC-day aggregate, reset at the day boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPnL {
    pub date: NaiveDate,
    pub total_trades: u32,
    pub successful_trades: u32,
    pub failed_trades: u32,
    pub net_pnl: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub total_fees: Decimal,
    pub volume_quote: Decimal,
}

impl DailyPnL {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_trades: 0,
            successful_trades: 0,
            failed_trades: 0,
            net_pnl: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            volume_quote: Decimal::ZERO,
        }
    }

    /// Win rate as a literal percentage in `[0, 100]`; `0` iff no trades yet.
    #[must_use]
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.successful_trades) * Decimal::from(100) / Decimal::from(self.total_trades)
    }

    pub fn record(&mut self, result: &TradeResult) {
        self.total_trades += 1;
        if matches!(result.status, TradeStatus::Success) {
            self.successful_trades += 1;
        } else {
            self.failed_trades += 1;
        }
        self.net_pnl += result.net_pnl;
        if result.net_pnl >= Decimal::ZERO {
            self.gross_profit += result.net_pnl;
        } else {
            self.gross_loss += -result.net_pnl;
        }
        self.total_fees += result.fees;
        if let Some(ref order) = result.buy_order {
            self.volume_quote += order.fill_value();
        }
    }
}

/// Balance for one asset on one venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub total: Decimal,
    pub available: Decimal,
}

/// Combined per-asset holding across both venues at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub total_a: Decimal,
    pub available_a: Decimal,
    pub total_b: Decimal,
    pub available_b: Decimal,
    /// Valuation of `total_a + total_b` in the quote/valuation currency,
    /// `None` if the price oracle had no price for this asset.
    pub value_quote: Option<Decimal>,
}

impl AssetBalance {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total_a + self.total_b
    }

    /// `total_a / (total_a + total_b)`; only meaningful when the combined
    /// total is positive.
    #[must_use]
    pub fn distribution_ratio_a(&self) -> Option<Decimal> {
        let total = self.total();
        if total > Decimal::ZERO {
            Some(self.total_a / total)
        } else {
            None
        }
    }
}

/// Joint wallet state across both venues, appended to a bounded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancePoolSnapshot {
    pub ts: DateTime<Utc>,
    pub per_asset: Vec<AssetBalance>,
    pub total_value_quote: Decimal,
    pub peak_value_quote: Decimal,
}

/// Reason an emergency check fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyReason {
    MaxDrawdown,
    MaxLoss,
    ConsecutiveLosses,
    RapidLoss,
    CriticalImbalance,
}

/// Recommended reaction to an emergency condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyAction {
    PauseTrading,
    StopTrading,
    RebalanceImmediate,
    Hedge,
    AlertOnly,
}

/// Protection verdict produced per balance update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyCheck {
    pub should_trigger: bool,
    pub reason: Option<EmergencyReason>,
    pub current: Decimal,
    pub threshold: Decimal,
    pub action: Option<EmergencyAction>,
}

impl EmergencyCheck {
    #[must_use]
    pub fn none() -> Self {
        Self {
            should_trigger: false,
            reason: None,
            current: Decimal::ZERO,
            threshold: Decimal::ZERO,
            action: None,
        }
    }

    #[must_use]
    pub fn triggered(
        reason: EmergencyReason,
        current: Decimal,
        threshold: Decimal,
        action: EmergencyAction,
    ) -> Self {
        Self {
            should_trigger: true,
            reason: Some(reason),
            current,
            threshold,
            action: Some(action),
        }
    }
}

/// Urgency of a recommended rebalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RebalanceUrgency {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// One corrective asset transfer between venues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub asset: String,
    pub from: VenueId,
    pub to: VenueId,
    pub amount: Decimal,
    pub reason: String,
}

/// Full rebalance recommendation produced per balance update. Execution is
/// out of scope; the core only recommends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceRecommendation {
    pub actions: Vec<RebalanceAction>,
    pub urgency: RebalanceUrgency,
    pub summary: String,
}

impl RebalanceRecommendation {
    #[must_use]
    pub fn none() -> Self {
        Self {
            actions: Vec::new(),
            urgency: RebalanceUrgency::None,
            summary: "balances within tolerance".to_string(),
        }
    }
}
