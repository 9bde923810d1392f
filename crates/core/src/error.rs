//! Error types for the spot arbitrage engine.
//!
//! A venue-facing error (`VenueError`) distinguishes transient/network
//! failures from venue rejections, matching the taxonomy the engine needs
//! to decide whether a leg failure is retryable. `ArbError` wraps
//! `VenueError` alongside the engine's own invariant/config/fatal errors.

use thiserror::Error;

/// Errors surfaced by a `Venue` implementation.
#[derive(Debug, Error, Clone)]
pub enum VenueError {
    /// Network-level failure (connection refused, DNS, etc).
    #[error("network error: {0}")]
    Network(String),

    /// The call did not complete within its configured timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Venue-imposed rate limit.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// The venue rejected the request (bad params, insufficient balance, closed market, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Referenced order/symbol/account does not exist on the venue.
    #[error("not found: {0}")]
    NotFound(String),

    /// Venue unreachable or not connected (connect/disconnect/test_connection failures).
    #[error("venue unavailable: {0}")]
    Unavailable(String),
}

impl VenueError {
    /// Creates a rate-limit error.
    #[must_use]
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Transient failures are worth retrying the same call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. })
    }

    /// Transient failures that should not be treated as a hard rejection
    /// when classifying a leg outcome (network blips, not "no").
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } | Self::Unavailable(_)
        )
    }

    /// Suggested retry delay in seconds, if any.
    #[must_use]
    pub fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after_secs } => Some(*retry_after_secs),
            Self::Network(_) | Self::Timeout(_) => Some(1),
            _ => None,
        }
    }
}

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum ArbError {
    /// A venue call failed.
    #[error(transparent)]
    Venue(#[from] VenueError),

    /// A pair symbol or config value failed validation at the API boundary.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Configuration failed to load or parse.
    #[error("configuration error: {0}")]
    ConfigInvalid(String),

    /// A lock was found poisoned; this is a fatal, unrecoverable condition.
    #[error("poisoned lock: {0}")]
    PoisonedLock(String),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ArbError>;
