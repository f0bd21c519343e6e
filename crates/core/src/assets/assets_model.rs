//! Asset and balance transaction models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Broad class of a balance-holding unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    #[default]
    Fiat,
    Crypto,
}

/// A balance-holding unit that can be earmarked for one or more goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    /// Currency (or ticker) the balance and allocations are denominated in.
    pub currency: String,
}

/// A signed balance change reported by the transaction source.
///
/// Timestamps are wall-clock instants so that same-day ordering is exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub asset_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Balance implied by `transactions` at instant `at` (inclusive).
pub fn balance_at(transactions: &[Transaction], at: DateTime<Utc>) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.timestamp <= at)
        .map(|t| t.amount)
        .sum()
}
