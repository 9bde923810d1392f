//! An in-memory, scriptable `Venue` implementation.
//!
//! Real venue connectors are treated as external collaborators, but the
//! uniform venue abstraction needs at least one concrete implementation to
//! exercise the engine end-to-end. Every call is scriptable so tests can
//! force timeouts, rejections, and partial fills deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use arb_core::error::VenueError;
use arb_core::types::{Balance, Order, OrderBook, OrderRequest, OrderStatus, Ticker};
use arb_core::venue::Venue;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// A scripted response for the next call to `place_order`. When the queue
/// for a venue is empty, `place_order` defaults to a full fill at the
/// requested price (or the ticker's last price for market orders).
#[derive(Debug, Clone)]
pub enum PlacementScript {
    /// Fills the full requested quantity.
    Fill,
    /// Fills `qty` of the requested quantity, leaving the order `PartiallyFilled`.
    PartialFill(Decimal),
    /// The venue rejects the order outright (no position change).
    Reject(String),
    /// The call times out (a leg failure from the executor's perspective).
    Timeout(String),
    /// A network-level failure.
    NetworkError(String),
}

struct MockState {
    tickers: HashMap<String, Ticker>,
    order_books: HashMap<String, OrderBook>,
    balances: HashMap<String, Balance>,
    orders: HashMap<String, Order>,
    placement_queue: VecDeque<PlacementScript>,
    connected: bool,
}

/// A fully in-memory `Venue`. Configure tickers/balances/placement scripts
/// before handing it to the engine; `get_order`/`cancel_order` read and
/// mutate the same order table `place_order` writes to, so a test can
/// script a partial fill then later drive it to `Filled` via
/// [`MockVenue::advance_order`] to exercise `WaitMore`.
pub struct MockVenue {
    name: String,
    state: Mutex<MockState>,
    order_seq: AtomicU64,
}

impl MockVenue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockState {
                tickers: HashMap::new(),
                order_books: HashMap::new(),
                balances: HashMap::new(),
                orders: HashMap::new(),
                placement_queue: VecDeque::new(),
                connected: false,
            }),
            order_seq: AtomicU64::new(1),
        }
    }

    pub fn set_ticker(&self, symbol: impl Into<String>, ticker: Ticker) {
        self.state.lock().tickers.insert(symbol.into(), ticker);
    }

    pub fn set_order_book(&self, symbol: impl Into<String>, book: OrderBook) {
        self.state.lock().order_books.insert(symbol.into(), book);
    }

    pub fn set_balance(&self, asset: impl Into<String>, balance: Balance) {
        self.state.lock().balances.insert(asset.into(), balance);
    }

    /// Queues one scripted response for the next `place_order` call.
    /// Scripts are consumed in FIFO order.
    pub fn queue_placement(&self, script: PlacementScript) {
        self.state.lock().placement_queue.push_back(script);
    }

    /// Directly mutates a previously placed order's status/fill, simulating
    /// a fill that completes after the initial placement call returns — used
    /// to exercise the `WaitMore` partial-fill poll.
    pub fn advance_order(&self, order_id: &str, status: OrderStatus, filled_qty: Decimal, avg_filled_price: Decimal) {
        if let Some(order) = self.state.lock().orders.get_mut(order_id) {
            order.status = status;
            order.filled_qty = filled_qty;
            order.avg_filled_price = avg_filled_price;
        }
    }

    #[must_use]
    pub fn order_snapshot(&self, order_id: &str) -> Option<Order> {
        self.state.lock().orders.get(order_id).cloned()
    }

    fn next_order_id(&self) -> String {
        format!("{}-{}", self.name, self.order_seq.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl Venue for MockVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), VenueError> {
        self.state.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VenueError> {
        self.state.lock().connected = false;
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), VenueError> {
        if self.state.lock().connected {
            Ok(())
        } else {
            Err(VenueError::Unavailable(format!("{} not connected", self.name)))
        }
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, VenueError> {
        self.state
            .lock()
            .tickers
            .get(symbol)
            .cloned()
            .ok_or_else(|| VenueError::NotFound(format!("no ticker for {symbol}")))
    }

    async fn get_order_book(&self, symbol: &str, _depth: u32) -> Result<OrderBook, VenueError> {
        self.state
            .lock()
            .order_books
            .get(symbol)
            .cloned()
            .ok_or_else(|| VenueError::NotFound(format!("no order book for {symbol}")))
    }

    async fn get_balance(&self) -> Result<HashMap<String, Balance>, VenueError> {
        Ok(self.state.lock().balances.clone())
    }

    async fn get_asset_balance(&self, asset: &str) -> Result<Balance, VenueError> {
        self.state
            .lock()
            .balances
            .get(asset)
            .copied()
            .ok_or_else(|| VenueError::NotFound(format!("no balance for {asset}")))
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Order, VenueError> {
        let script = self.state.lock().placement_queue.pop_front();
        let order_id = self.next_order_id();
        let reference_price = request.price.unwrap_or_else(|| {
            self.state
                .lock()
                .tickers
                .get(&request.symbol)
                .map_or(Decimal::ZERO, |t| t.last_price)
        });

        let order = match script {
            Some(PlacementScript::Reject(reason)) => return Err(VenueError::Rejected(reason)),
            Some(PlacementScript::Timeout(reason)) => return Err(VenueError::Timeout(reason)),
            Some(PlacementScript::NetworkError(reason)) => return Err(VenueError::Network(reason)),
            Some(PlacementScript::PartialFill(qty)) => Order {
                order_id: order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                status: OrderStatus::PartiallyFilled,
                requested_qty: request.quantity,
                filled_qty: qty,
                avg_filled_price: reference_price,
                fee: qty * reference_price * Decimal::new(1, 3),
                fee_currency: "QUOTE".to_string(),
                ts: Utc::now(),
            },
            Some(PlacementScript::Fill) | None => Order {
                order_id: order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                status: OrderStatus::Filled,
                requested_qty: request.quantity,
                filled_qty: request.quantity,
                avg_filled_price: reference_price,
                fee: request.quantity * reference_price * Decimal::new(1, 3),
                fee_currency: "QUOTE".to_string(),
                ts: Utc::now(),
            },
        };

        self.state.lock().orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &str) -> Result<(), VenueError> {
        let mut state = self.state.lock();
        match state.orders.get_mut(order_id) {
            Some(order) if order.status.is_open() => {
                order.status = OrderStatus::Cancelled;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(VenueError::NotFound(format!("no order {order_id}"))),
        }
    }

    async fn get_order(&self, _symbol: &str, order_id: &str) -> Result<Order, VenueError> {
        self.state
            .lock()
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| VenueError::NotFound(format!("no order {order_id}")))
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, VenueError> {
        let state = self.state.lock();
        Ok(state
            .orders
            .values()
            .filter(|o| o.status.is_open())
            .filter(|o| symbol.is_none_or(|s| s == o.symbol))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_core::types::Side;
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str, bid: Decimal, ask: Decimal) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            bid_price: bid,
            bid_qty: dec!(1),
            ask_price: ask,
            ask_qty: dec!(1),
            last_price: ask,
            ts: Utc::now(),
        }
    }

    #[tokio::test]
    async fn default_placement_fills_fully() {
        let venue = MockVenue::new("A");
        venue.set_ticker("BTCUSDT", ticker("BTCUSDT", dec!(100), dec!(101)));
        let req = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        let order = venue.place_order(&req).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_qty, dec!(1));
    }

    #[tokio::test]
    async fn queued_rejection_is_returned_as_an_error() {
        let venue = MockVenue::new("A");
        venue.queue_placement(PlacementScript::Reject("insufficient balance".to_string()));
        let req = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        let result = venue.place_order(&req).await;
        assert!(matches!(result, Err(VenueError::Rejected(_))));
    }

    #[tokio::test]
    async fn partial_fill_then_advance_to_filled() {
        let venue = MockVenue::new("A");
        venue.set_ticker("BTCUSDT", ticker("BTCUSDT", dec!(100), dec!(101)));
        venue.queue_placement(PlacementScript::PartialFill(dec!(0.5)));
        let req = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        let order = venue.place_order(&req).await.unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);

        venue.advance_order(&order.order_id, OrderStatus::Filled, dec!(1), dec!(101));
        let updated = venue.get_order("BTCUSDT", &order.order_id).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Filled);
        assert_eq!(updated.filled_qty, dec!(1));
    }

    #[tokio::test]
    async fn cancel_marks_open_order_cancelled() {
        let venue = MockVenue::new("A");
        venue.queue_placement(PlacementScript::PartialFill(dec!(0.5)));
        let req = OrderRequest::market("BTCUSDT", Side::Buy, dec!(1));
        let order = venue.place_order(&req).await.unwrap();
        venue.cancel_order("BTCUSDT", &order.order_id).await.unwrap();
        let updated = venue.get_order("BTCUSDT", &order.order_id).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn unconnected_venue_fails_test_connection() {
        let venue = MockVenue::new("A");
        assert!(venue.test_connection().await.is_err());
        venue.connect().await.unwrap();
        assert!(venue.test_connection().await.is_ok());
    }
}
