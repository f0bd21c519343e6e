//! FX-specific error types.

use thiserror::Error;

/// Errors raised while fetching or applying exchange rates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FxError {
    /// No rate could be fetched and none was ever cached for the pair.
    #[error("Exchange rate {from}/{to} unavailable: {reason}")]
    RateUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    /// No conversion path exists between two currencies in a rate table.
    #[error("Exchange rate not found: {0}")]
    RateNotFound(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Rate source failed: {0}")]
    FetchError(String),

    #[error("Rate cache error: {0}")]
    CacheError(String),
}

impl FxError {
    pub fn unavailable(from: &str, to: &str, reason: impl Into<String>) -> Self {
        Self::RateUnavailable {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }
}
