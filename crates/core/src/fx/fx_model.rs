use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency_converter::RateTable;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    #[serde(serialize_with = "serialize_decimal_6")]
    pub rate: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl ExchangeRate {
    /// Creates the map key for a pair.
    /// Returns format: "EUR/USD"
    pub fn make_pair_key(from: &str, to: &str) -> String {
        format!("{}/{}", from, to)
    }

    /// Parses "EUR/USD" into ("EUR", "USD").
    pub fn parse_pair_key(key: &str) -> Option<(String, String)> {
        key.split_once('/')
            .filter(|(base, quote)| !base.is_empty() && !quote.is_empty())
            .map(|(base, quote)| (base.to_string(), quote.to_string()))
    }
}

fn serialize_decimal_6<S>(decimal: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rounded = decimal.round_dp(6);
    serializer.serialize_str(&rounded.to_string())
}

/// A rate as handed to the engine: fresh from the source, or the last known
/// value when the source failed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    /// When the rate was observed at the source.
    pub as_of: DateTime<Utc>,
    pub is_stale: bool,
}

/// Current rates gathered for one computation.
#[derive(Debug, Clone, Default)]
pub struct LiveRates {
    pub table: RateTable,
    pub quotes: Vec<RateQuote>,
    /// Pairs with neither a fresh nor a cached rate.
    pub missing: Vec<(String, String)>,
}

impl LiveRates {
    pub fn from_quotes(quotes: Vec<RateQuote>, missing: Vec<(String, String)>) -> Self {
        let mut table = RateTable::default();
        for quote in &quotes {
            table.insert(&quote.from_currency, &quote.to_currency, quote.rate);
        }
        Self {
            table,
            quotes,
            missing,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.quotes.iter().any(|q| q.is_stale)
    }

    /// Freezes the rates currently known, keyed by "FROM/TO".
    pub fn freeze(&self) -> FrozenRates {
        FrozenRates {
            rates: self
                .quotes
                .iter()
                .map(|q| {
                    (
                        ExchangeRate::make_pair_key(&q.from_currency, &q.to_currency),
                        q.rate,
                    )
                })
                .collect(),
        }
    }
}

/// Rates captured at completion time. Never change after capture.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FrozenRates {
    pub rates: BTreeMap<String, Decimal>,
}

impl FrozenRates {
    pub fn to_table(&self) -> RateTable {
        let mut table = RateTable::default();
        for (key, rate) in &self.rates {
            if let Some((from, to)) = ExchangeRate::parse_pair_key(key) {
                table.insert(&from, &to, *rate);
            }
        }
        table
    }
}

/// Which rates a derivation uses. Executing months convert with the live
/// rates; closed months convert with the rates frozen at completion.
#[derive(Debug, Clone, Copy)]
pub enum RateBasis<'a> {
    Live(&'a LiveRates),
    Frozen(&'a RateTable),
}

impl RateBasis<'_> {
    /// Units of `to` per unit of `from`.
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        match self {
            RateBasis::Live(live) => live.table.rate(from, to).ok(),
            RateBasis::Frozen(table) => table.rate(from, to).ok(),
        }
    }

    pub fn is_stale(&self) -> bool {
        match self {
            RateBasis::Live(live) => live.is_stale(),
            RateBasis::Frozen(_) => false,
        }
    }
}
