//! Pair registry: a concurrent map from symbol to pair state, with
//! per-entry locking so updating one pair's tickers never blocks a read
//! of another. Built with `parking_lot` in the same spirit as an
//! aggregate guarded by one short-held lock, generalized to a keyed
//! collection.

use std::collections::HashMap;
use std::sync::Arc;

use arb_core::types::TradingPair;
use parking_lot::{Mutex, RwLock};

/// A snapshot-friendly concurrent collection of trading pairs keyed by
/// symbol. The outer `RwLock` only guards structural changes (insert);
/// per-pair reads/writes go through that pair's own `Mutex` and never
/// contend with a concurrent read of a different pair.
#[derive(Default)]
pub struct PairRegistry {
    pairs: RwLock<HashMap<String, Arc<Mutex<TradingPair>>>>,
}

impl PairRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: RwLock::new(HashMap::new()) }
    }

    /// Builds a registry from the seed `"BASE/QUOTE"` symbols in
    /// `ArbConfig::trading_pairs`. Returns an error for any malformed entry.
    pub fn from_symbols(symbols: &[String], qty_precision: u32) -> Result<Self, String> {
        let registry = Self::new();
        for symbol in symbols {
            let pair = TradingPair::new(symbol, qty_precision)?;
            registry.insert(pair);
        }
        Ok(registry)
    }

    pub fn insert(&self, pair: TradingPair) {
        self.pairs.write().insert(pair.symbol.clone(), Arc::new(Mutex::new(pair)));
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Arc<Mutex<TradingPair>>> {
        self.pairs.read().get(symbol).cloned()
    }

    /// Removes `symbol` from the registry, returning its last known state.
    pub fn remove(&self, symbol: &str) -> Option<TradingPair> {
        self.pairs.write().remove(symbol).map(|pair| pair.lock().clone())
    }

    /// All registered pairs' current symbols, in insertion-order-agnostic
    /// but stable iteration (sorted, so scheduler runs are deterministic).
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.pairs.read().keys().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.read().is_empty()
    }
}
