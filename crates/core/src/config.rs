//! Configuration types for the spot arbitrage engine.
//!
//! Loading is handled by [`crate::config_loader::ConfigLoader`]; credential
//! *values* are never read here, only the environment variable *names* that
//! hold them (`api_key_env`, `api_secret_env`, `passphrase_env`) — resolving
//! those is a venue connector's job, out of this crate's scope.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-venue identity and fee configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub api_base_url: String,
    pub api_key_env: String,
    pub api_secret_env: String,
    #[serde(default)]
    pub passphrase_env: Option<String>,
    /// Literal percentage, e.g. `0.1` means 0.1%.
    pub trading_fee_percent: Decimal,
    pub rate_limit_per_second: u32,
    pub timeout_ms: u64,
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

const fn default_true() -> bool {
    true
}

/// How the executor resolves an order's leftover quantity after partial
/// fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFillStrategy {
    WaitMore,
    Hedge,
    CancelRemaining,
}

/// How the executor responds when exactly one leg of a trade fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneSideFailStrategy {
    Hedge,
    CutLoss,
    DoNothing,
}

/// Order type the executor builds legs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTypeConfig {
    Market,
    Limit,
}

/// Strategy-level thresholds.
///
/// `min_spread_percentage` is evaluated against the **net** (post-fee)
/// spread, not the gross quoted spread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Net, post-fee. Literal percentage.
    pub min_spread_percentage: Decimal,
    pub min_expected_profit_quote: Decimal,
    pub polling_interval_ms: u64,
    pub order_type: OrderTypeConfig,
    /// Literal percentage.
    pub limit_order_slippage_pct: Decimal,
    pub order_fill_timeout_ms: u64,
    pub partial_fill_strategy: PartialFillStrategy,
    pub one_side_fail_strategy: OneSideFailStrategy,
    pub min_depth_qty: Decimal,
}

impl StrategyConfig {
    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    #[must_use]
    pub fn order_fill_timeout(&self) -> Duration {
        Duration::from_millis(self.order_fill_timeout_ms)
    }
}

/// Risk-gate and emergency-protection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Quote-currency cap on a single trade's notional.
    pub max_position_size_per_trade: Decimal,
    pub max_daily_loss: Decimal,
    pub max_trades_per_day: u32,
    pub min_time_between_trades_ms: u64,
    pub max_consecutive_losses: u32,
    /// Literal percentage.
    pub max_drawdown_percent: Decimal,
    /// Literal percentage.
    pub rebalance_threshold_percent: Decimal,
}

impl RiskConfig {
    #[must_use]
    pub fn min_time_between_trades(&self) -> Duration {
        Duration::from_millis(self.min_time_between_trades_ms)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbConfig {
    pub exchange_a: ExchangeConfig,
    pub exchange_b: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    /// `"BASE/QUOTE"` entries seeding the pair registry.
    pub trading_pairs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ArbConfig {
        ArbConfig {
            exchange_a: ExchangeConfig {
                name: "venue-a".to_string(),
                api_base_url: "https://a.example".to_string(),
                api_key_env: "A_API_KEY".to_string(),
                api_secret_env: "A_API_SECRET".to_string(),
                passphrase_env: None,
                trading_fee_percent: Decimal::new(1, 1),
                rate_limit_per_second: 10,
                timeout_ms: 5000,
                max_retries: 3,
                is_enabled: true,
            },
            exchange_b: ExchangeConfig {
                name: "venue-b".to_string(),
                api_base_url: "https://b.example".to_string(),
                api_key_env: "B_API_KEY".to_string(),
                api_secret_env: "B_API_SECRET".to_string(),
                passphrase_env: Some("B_API_PASSPHRASE".to_string()),
                trading_fee_percent: Decimal::new(1, 1),
                rate_limit_per_second: 10,
                timeout_ms: 5000,
                max_retries: 3,
                is_enabled: true,
            },
            strategy: StrategyConfig {
                min_spread_percentage: Decimal::new(3, 1),
                min_expected_profit_quote: Decimal::new(5, 1),
                polling_interval_ms: 1000,
                order_type: OrderTypeConfig::Market,
                limit_order_slippage_pct: Decimal::new(5, 2),
                order_fill_timeout_ms: 10_000,
                partial_fill_strategy: PartialFillStrategy::CancelRemaining,
                one_side_fail_strategy: OneSideFailStrategy::Hedge,
                min_depth_qty: Decimal::new(1, 2),
            },
            risk: RiskConfig {
                max_position_size_per_trade: Decimal::from(1000),
                max_daily_loss: Decimal::from(50),
                max_trades_per_day: 100,
                min_time_between_trades_ms: 5000,
                max_consecutive_losses: 3,
                max_drawdown_percent: Decimal::from(5),
                rebalance_threshold_percent: Decimal::from(30),
            },
            trading_pairs: vec!["BTC/USDT".to_string()],
        }
    }

    #[test]
    fn config_serde_round_trip() {
        let config = sample_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: ArbConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.trading_pairs, config.trading_pairs);
        assert_eq!(back.strategy.min_spread_percentage, config.strategy.min_spread_percentage);
        assert_eq!(back.risk.max_daily_loss, config.risk.max_daily_loss);
    }

    #[test]
    fn duration_helpers_convert_millis() {
        let config = sample_config();
        assert_eq!(config.strategy.polling_interval(), Duration::from_millis(1000));
        assert_eq!(config.risk.min_time_between_trades(), Duration::from_millis(5000));
    }
}
