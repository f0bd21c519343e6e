//! Allocation domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How much of an asset is currently earmarked for a goal.
/// Exactly one per (asset, goal) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationTarget {
    pub id: String,
    pub asset_id: String,
    pub goal_id: String,
    /// In the asset's currency.
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of an allocation target taking a new value.
///
/// The target of a pair at instant T is the entry with the latest
/// `timestamp <= T`; entries with equal timestamps are ordered by
/// `recorded_at`, then by append order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationHistoryEntry {
    pub id: String,
    pub asset_id: String,
    pub goal_id: String,
    /// Absolute target after this entry, in the asset's currency.
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    /// Set when the entry was produced by auto-routing a transaction.
    pub source_transaction_id: Option<String>,
}

/// Identifies one (asset, goal) series in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationKey {
    pub asset_id: String,
    pub goal_id: String,
}

impl AllocationKey {
    pub fn new(asset_id: impl Into<String>, goal_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            goal_id: goal_id.into(),
        }
    }
}

impl From<&AllocationHistoryEntry> for AllocationKey {
    fn from(entry: &AllocationHistoryEntry) -> Self {
        Self::new(entry.asset_id.clone(), entry.goal_id.clone())
    }
}

/// Outcome of routing a new transaction on arrival.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RoutingDecision {
    /// The asset was 100% allocated to one goal; its target absorbed the change.
    #[serde(rename_all = "camelCase")]
    Dedicated {
        goal_id: String,
        entry: AllocationHistoryEntry,
    },
    /// The asset is shared across several goals; the value stays unallocated.
    Shared,
    /// The asset has an unallocated remainder; the value joins it.
    Partial,
    /// Nothing is allocated from this asset.
    Unallocated,
}

/// One goal's effective share of an asset's balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveAllocation {
    pub goal_id: String,
    pub target: Decimal,
    pub effective: Decimal,
}

/// Targets of one asset set against its balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSplit {
    pub balance: Decimal,
    pub total_targets: Decimal,
    pub allocations: Vec<EffectiveAllocation>,
    /// `total_targets - balance` when over-allocated, otherwise 0.
    pub shortfall: Decimal,
}

impl AllocationSplit {
    pub fn effective_for(&self, goal_id: &str) -> Decimal {
        self.allocations
            .iter()
            .find(|a| a.goal_id == goal_id)
            .map(|a| a.effective)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_over_allocated(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }

    pub fn unallocated(&self) -> Decimal {
        (self.balance - self.total_targets).max(Decimal::ZERO)
    }
}

/// Sets `targets` against `balance`.
///
/// When the targets exceed the balance they are treated as a plan: the
/// balance actually present is split in proportion to the targets and the
/// gap is reported as `shortfall`. Never fails.
pub fn split_balance(balance: Decimal, targets: &[(String, Decimal)]) -> AllocationSplit {
    let total_targets: Decimal = targets
        .iter()
        .map(|(_, amount)| (*amount).max(Decimal::ZERO))
        .sum();
    let over_allocated = total_targets > balance;
    let available = balance.max(Decimal::ZERO);

    let allocations = targets
        .iter()
        .map(|(goal_id, target)| {
            let target = (*target).max(Decimal::ZERO);
            let effective = if over_allocated && !total_targets.is_zero() {
                target * available / total_targets
            } else {
                target
            };
            EffectiveAllocation {
                goal_id: goal_id.clone(),
                target,
                effective,
            }
        })
        .collect();

    AllocationSplit {
        balance,
        total_targets,
        allocations,
        shortfall: if over_allocated {
            total_targets - balance
        } else {
            Decimal::ZERO
        },
    }
}
