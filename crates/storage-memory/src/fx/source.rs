use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use goalpace_core::fx::{ExchangeRate, ExchangeRateSourceTrait, FxError};
use goalpace_core::utils::Clock;
use goalpace_core::Result;
use rust_decimal::Decimal;

use crate::errors::IntoCore;

const RATES: &str = "exchange_rates";

/// Rate source fed by hand, e.g. from an import or a fixture.
///
/// `set_offline(true)` makes every fetch fail, which is how a provider
/// outage looks to the rate service.
pub struct ManualRateSource {
    rates: RwLock<HashMap<(String, String), Decimal>>,
    offline: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl ManualRateSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rates: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            clock,
        }
    }

    pub fn set_rate(&self, from_currency: &str, to_currency: &str, rate: Decimal) -> Result<()> {
        self.rates
            .write()
            .into_core(RATES)?
            .insert((from_currency.to_string(), to_currency.to_string()), rate);
        Ok(())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExchangeRateSourceTrait for ManualRateSource {
    async fn fetch_rate(&self, from_currency: &str, to_currency: &str) -> Result<ExchangeRate> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FxError::FetchError("rate source offline".to_string()).into());
        }
        let rates = self.rates.read().into_core(RATES)?;
        let rate = match rates.get(&(from_currency.to_string(), to_currency.to_string())) {
            Some(rate) => *rate,
            None => rates
                .get(&(to_currency.to_string(), from_currency.to_string()))
                .filter(|inverse| !inverse.is_zero())
                .map(|inverse| Decimal::ONE / inverse)
                .ok_or_else(|| {
                    FxError::RateNotFound(ExchangeRate::make_pair_key(from_currency, to_currency))
                })?,
        };
        Ok(ExchangeRate {
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
            rate,
            timestamp: self.clock.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use goalpace_core::fx::{FxService, FxServiceTrait};
    use goalpace_core::utils::SystemClock;
    use rust_decimal_macros::dec;

    fn source() -> Arc<ManualRateSource> {
        let source = Arc::new(ManualRateSource::new(Arc::new(SystemClock)));
        source.set_rate("EUR", "USD", dec!(1.25)).unwrap();
        source
    }

    #[tokio::test]
    async fn test_direct_and_inverse_rates() {
        let source = source();
        assert_eq!(source.fetch_rate("EUR", "USD").await.unwrap().rate, dec!(1.25));
        assert_eq!(source.fetch_rate("USD", "EUR").await.unwrap().rate, dec!(0.8));
        assert!(source.fetch_rate("EUR", "JPY").await.is_err());
    }

    #[tokio::test]
    async fn test_outage_yields_stale_last_known_rate() {
        let source = source();
        let fx = FxService::new(source.clone(), Arc::new(SystemClock));
        fx.get_rate("EUR", "USD").await.unwrap();

        source.set_offline(true);
        let quote = fx.get_rate("EUR", "USD").await.unwrap();
        assert!(quote.is_stale);
        assert_eq!(quote.rate, dec!(1.25));
        assert!(quote.as_of <= Utc::now());
    }
}
