//! Shared domain types, the venue abstraction, configuration, errors, and
//! the event bus for the cross-exchange spot arbitrage engine.
//!
//! This crate owns no trading logic; `arb-engine` builds the analyzer, risk
//! gate, executor, scheduler, and balance pool on top of the types defined
//! here.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod oracle;
pub mod types;
pub mod venue;

pub use config::ArbConfig;
pub use config_loader::ConfigLoader;
pub use error::{ArbError, Result, VenueError};
pub use events::{ArbEvent, EngineStatus, EventBus, EventSubscriber};
pub use oracle::PriceOracle;
pub use venue::{Clock, RandomSource, SystemClock, Venue};
