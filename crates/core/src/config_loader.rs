use crate::config::ArbConfig;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

/// Loads [`ArbConfig`] by layering TOML and environment variables:
/// `Figment::new().merge(Toml::file(...)).merge(Env::prefixed(...))`.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from `config/Config.toml`, overridden by `ARB_`-
    /// prefixed environment variables.
    ///
    /// # Errors
    /// Returns an error if the file is missing/unparseable or required
    /// fields are absent.
    pub fn load() -> Result<ArbConfig, figment::Error> {
        Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed("ARB_"))
            .extract()
    }

    /// Loads configuration from an explicit path, then an optional
    /// `config/Config.local.toml` override, then environment variables.
    ///
    /// # Errors
    /// Returns an error if the file is missing/unparseable or required
    /// fields are absent.
    pub fn load_from(path: &str) -> Result<ArbConfig, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Toml::file("config/Config.local.toml"))
            .merge(Env::prefixed("ARB_"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_missing_file_errors() {
        let result = ConfigLoader::load_from("config/does-not-exist.toml");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_parses_a_minimal_toml_file() {
        let mut tmp = tempfile_for_test();
        writeln!(
            tmp.1,
            r#"
[exchange_a]
name = "venue-a"
api_base_url = "https://a.example"
api_key_env = "A_KEY"
api_secret_env = "A_SECRET"
trading_fee_percent = "0.1"
rate_limit_per_second = 10
timeout_ms = 5000
max_retries = 3

[exchange_b]
name = "venue-b"
api_base_url = "https://b.example"
api_key_env = "B_KEY"
api_secret_env = "B_SECRET"
trading_fee_percent = "0.1"
rate_limit_per_second = 10
timeout_ms = 5000
max_retries = 3

[strategy]
min_spread_percentage = "0.3"
min_expected_profit_quote = "0.5"
polling_interval_ms = 1000
order_type = "market"
limit_order_slippage_pct = "0.05"
order_fill_timeout_ms = 10000
partial_fill_strategy = "cancel_remaining"
one_side_fail_strategy = "hedge"
min_depth_qty = "0.01"

[risk]
max_position_size_per_trade = "1000"
max_daily_loss = "50"
max_trades_per_day = 100
min_time_between_trades_ms = 5000
max_consecutive_losses = 3
max_drawdown_percent = "5"
rebalance_threshold_percent = "30"

trading_pairs = ["BTC/USDT"]
"#
        )
        .unwrap();
        tmp.1.flush().unwrap();

        let config = ConfigLoader::load_from(tmp.0.to_str().unwrap()).unwrap();
        assert_eq!(config.trading_pairs, vec!["BTC/USDT".to_string()]);
        assert_eq!(config.exchange_a.name, "venue-a");
    }

    /// Returns a path inside a fresh temp dir plus an open file handle,
    /// avoiding an extra dependency on the `tempfile` crate for one test.
    fn tempfile_for_test() -> (std::path::PathBuf, std::fs::File) {
        let dir = std::env::temp_dir().join(format!("arb-core-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Config.toml");
        let file = std::fs::File::create(&path).unwrap();
        (path, file)
    }
}
