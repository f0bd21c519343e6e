use super::fx_errors::FxError;
use super::fx_model::{ExchangeRate, LiveRates, RateQuote};
use super::fx_traits::{ExchangeRateSourceTrait, FxServiceTrait};
use crate::errors::Result;
use crate::utils::Clock;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct FxService {
    source: Arc<dyn ExchangeRateSourceTrait>,
    clock: Arc<dyn Clock>,
    /// Last successfully fetched rate per (from, to).
    last_known: Arc<RwLock<HashMap<(String, String), ExchangeRate>>>,
}

impl FxService {
    pub fn new(source: Arc<dyn ExchangeRateSourceTrait>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            last_known: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn validate_code(code: &str) -> std::result::Result<(), FxError> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FxError::InvalidCurrencyCode(format!(
                "Invalid currency code: '{}'",
                code
            )));
        }
        Ok(())
    }

    fn remember(&self, rate: &ExchangeRate) -> std::result::Result<(), FxError> {
        let mut cache = self
            .last_known
            .write()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        cache.insert(
            (rate.from_currency.clone(), rate.to_currency.clone()),
            rate.clone(),
        );
        Ok(())
    }

    fn cached(&self, from: &str, to: &str) -> std::result::Result<Option<ExchangeRate>, FxError> {
        let cache = self
            .last_known
            .read()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        if let Some(rate) = cache.get(&(from.to_string(), to.to_string())) {
            return Ok(Some(rate.clone()));
        }
        // An inverse observation is as good as a direct one
        Ok(cache
            .get(&(to.to_string(), from.to_string()))
            .filter(|inverse| !inverse.rate.is_zero())
            .map(|inverse| ExchangeRate {
                from_currency: from.to_string(),
                to_currency: to.to_string(),
                rate: rust_decimal::Decimal::ONE / inverse.rate,
                timestamp: inverse.timestamp,
            }))
    }
}

#[async_trait]
impl FxServiceTrait for FxService {
    fn seed_rates(&self, rates: Vec<ExchangeRate>) -> Result<()> {
        for rate in &rates {
            self.remember(rate)?;
        }
        log::debug!("Seeded {} last-known exchange rate(s)", rates.len());
        Ok(())
    }

    async fn get_rate(&self, from_currency: &str, to_currency: &str) -> Result<RateQuote> {
        Self::validate_code(from_currency)?;
        Self::validate_code(to_currency)?;

        if from_currency == to_currency {
            return Ok(RateQuote {
                from_currency: from_currency.to_string(),
                to_currency: to_currency.to_string(),
                rate: rust_decimal::Decimal::ONE,
                as_of: self.clock.now(),
                is_stale: false,
            });
        }

        match self.source.fetch_rate(from_currency, to_currency).await {
            Ok(rate) => {
                self.remember(&rate)?;
                Ok(RateQuote {
                    from_currency: from_currency.to_string(),
                    to_currency: to_currency.to_string(),
                    rate: rate.rate,
                    as_of: rate.timestamp,
                    is_stale: false,
                })
            }
            Err(fetch_error) => match self.cached(from_currency, to_currency)? {
                Some(last) => {
                    log::warn!(
                        "Rate fetch for {}/{} failed ({}); using last known rate from {}",
                        from_currency,
                        to_currency,
                        fetch_error,
                        last.timestamp
                    );
                    Ok(RateQuote {
                        from_currency: from_currency.to_string(),
                        to_currency: to_currency.to_string(),
                        rate: last.rate,
                        as_of: last.timestamp,
                        is_stale: true,
                    })
                }
                None => Err(FxError::unavailable(
                    from_currency,
                    to_currency,
                    fetch_error.to_string(),
                )
                .into()),
            },
        }
    }

    async fn get_live_rates(&self, pairs: &[(String, String)]) -> LiveRates {
        let unique: HashSet<&(String, String)> =
            pairs.iter().filter(|(from, to)| from != to).collect();

        let mut quotes = Vec::with_capacity(unique.len());
        let mut missing = Vec::new();
        for (from, to) in unique {
            match self.get_rate(from, to).await {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    log::error!("No exchange rate available for {}/{}: {}", from, to, e);
                    missing.push((from.clone(), to.clone()));
                }
            }
        }
        missing.sort();
        LiveRates::from_quotes(quotes, missing)
    }
}
