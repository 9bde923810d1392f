//! The uniform venue abstraction. Real connectors (REST/WS clients,
//! authentication, rate limiting) are explicitly out of scope for this
//! crate; this trait is the capability surface the engine needs from
//! whichever connector is plugged in.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::VenueError;
use crate::types::{Balance, Order, OrderBook, OrderRequest, Ticker};

/// Capability set every venue connector exposes to the engine.
///
/// Every call is expected to be cancel-safe: a caller dropping the future
/// must not leave the venue or the engine's bookkeeping in an inconsistent
/// state. Implementations should map network/timeout conditions to
/// `VenueError::Network`/`Timeout` and venue-side rejections to
/// `VenueError::Rejected`, so the engine's retry/failure-classification
/// logic can tell the two apart.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Human-readable venue name, used in logs and events.
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<(), VenueError>;

    async fn disconnect(&self) -> Result<(), VenueError>;

    async fn test_connection(&self) -> Result<(), VenueError>;

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, VenueError>;

    async fn get_order_book(&self, symbol: &str, depth: u32) -> Result<OrderBook, VenueError>;

    /// All asset balances known to the venue.
    async fn get_balance(&self) -> Result<HashMap<String, Balance>, VenueError>;

    async fn get_asset_balance(&self, asset: &str) -> Result<Balance, VenueError>;

    async fn place_order(&self, request: &OrderRequest) -> Result<Order, VenueError>;

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), VenueError>;

    async fn get_order(&self, symbol: &str, order_id: &str) -> Result<Order, VenueError>;

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, VenueError>;
}

/// Injected clock, so timing (day-boundary resets, cooldowns, sleeps) is
/// deterministic and mockable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Injected randomness source, for any policy that needs a random choice
/// (e.g. tie-breaking jitter); kept separate from `Clock` so both can be
/// swapped independently in tests.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `[0.0, 1.0)`.
    fn next_f64(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_returns_utc_now_monotonically_nondecreasing() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
