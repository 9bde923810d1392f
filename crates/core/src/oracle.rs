//! Asset valuation for the balance pool.
//!
//! Falling back to a hard-coded price for an unknown asset silently
//! mis-prices the portfolio. This trait returns `None` for an asset it
//! cannot price, and the balance pool must skip that asset's valuation
//! rather than fabricate a number.

use rust_decimal::Decimal;

/// Resolves an asset to its price in the engine's quote/valuation currency.
pub trait PriceOracle: Send + Sync {
    /// Returns the price of one unit of `asset`, or `None` if unknown.
    /// Implementations must never fabricate a price for an asset they do
    /// not actually have a quote for.
    fn price_of(&self, asset: &str) -> Option<Decimal>;
}

/// A fixed-table oracle: stablecoins pegged at 1.0, everything else looked
/// up from a caller-supplied table. Returns `None` for anything absent.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    prices: std::collections::HashMap<String, Decimal>,
}

impl StaticPriceOracle {
    #[must_use]
    pub fn new() -> Self {
        Self { prices: std::collections::HashMap::new() }
    }

    /// Registers `price` for `asset`. Stablecoins should be registered at
    /// `Decimal::ONE`; this type applies no implicit pegging of its own.
    #[must_use]
    pub fn with_price(mut self, asset: impl Into<String>, price: Decimal) -> Self {
        self.prices.insert(asset.into(), price);
        self
    }
}

impl PriceOracle for StaticPriceOracle {
    fn price_of(&self, asset: &str) -> Option<Decimal> {
        self.prices.get(asset).copied()
    }
}
