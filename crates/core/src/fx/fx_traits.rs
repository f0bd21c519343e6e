use super::fx_model::{ExchangeRate, LiveRates, RateQuote};
use crate::errors::Result;
use async_trait::async_trait;

/// External exchange-rate provider. May be slow, stale, or fail; timeouts
/// are the implementation's concern.
#[async_trait]
pub trait ExchangeRateSourceTrait: Send + Sync {
    /// Fetches the rate for `from -> to` as of now.
    async fn fetch_rate(&self, from_currency: &str, to_currency: &str) -> Result<ExchangeRate>;
}

/// Trait defining the contract for FX service operations.
#[async_trait]
pub trait FxServiceTrait: Send + Sync {
    /// Seeds the last-known cache, e.g. from persisted rates at startup.
    fn seed_rates(&self, rates: Vec<ExchangeRate>) -> Result<()>;

    /// Current rate for a pair, falling back to the last known rate with
    /// `is_stale = true` when the source fails.
    async fn get_rate(&self, from_currency: &str, to_currency: &str) -> Result<RateQuote>;

    /// Current rates for every pair. Never fails as a whole: pairs with no
    /// rate at all are reported in `LiveRates::missing`.
    async fn get_live_rates(&self, pairs: &[(String, String)]) -> LiveRates;
}
