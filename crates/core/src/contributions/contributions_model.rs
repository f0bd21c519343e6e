//! Month-scoped progress derived from the allocation history and balances.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocations::AllocationLedger;
use crate::assets::{balance_at, Asset, Transaction};
use crate::utils::MonthLabel;

/// Instants bounding a derivation. `start` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DerivationWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }
}

/// What produced a contribution line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContributionSource {
    /// A transaction auto-routed into a dedicated goal.
    #[serde(rename_all = "camelCase")]
    Transaction { transaction_id: String },
    /// A manual change of an allocation target.
    #[serde(rename_all = "camelCase")]
    Allocation { entry_id: String },
    /// Difference between the target changes and what the balance actually
    /// covers (over-allocation, balance movement on a shared asset).
    BalanceAdjustment,
}

/// One value-change event attributed to a goal inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionEvent {
    pub source: ContributionSource,
    pub asset_id: String,
    pub goal_id: String,
    pub timestamp: DateTime<Utc>,
    pub native_amount: Decimal,
    pub native_currency: String,
    pub goal_amount: Decimal,
    pub goal_currency: String,
}

/// Derived contribution of one goal over a window, in the goal's currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalContribution {
    pub goal_id: String,
    pub currency: String,
    pub derived_total: Decimal,
    pub events: Vec<ContributionEvent>,
}

/// Over-allocation of one asset at an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetShortfall {
    pub asset_id: String,
    pub currency: String,
    pub balance: Decimal,
    pub total_targets: Decimal,
    pub shortfall: Decimal,
}

/// Planned-versus-derived status of one goal for the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: String,
    pub goal_name: String,
    pub currency: String,
    pub planned_amount: Decimal,
    pub derived_total: Decimal,
    pub fulfilled: bool,
}

impl GoalProgress {
    /// Fraction of the planned amount reached. A zero plan counts as met.
    pub fn percent_complete(&self) -> Decimal {
        if self.planned_amount > Decimal::ZERO {
            (self.derived_total / self.planned_amount * Decimal::ONE_HUNDRED)
                .max(Decimal::ZERO)
                .round_dp(2)
        } else {
            Decimal::ONE_HUNDRED
        }
    }
}

/// Which rates a progress figure was converted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RateBasisKind {
    Live { stale: bool },
    Frozen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub month: MonthLabel,
    pub window: DerivationWindow,
    pub basis: RateBasisKind,
    pub goals: Vec<GoalProgress>,
    pub shortfalls: Vec<AssetShortfall>,
    pub events: Vec<ContributionEvent>,
}

impl ProgressReport {
    pub fn unfulfilled(&self) -> impl Iterator<Item = &GoalProgress> {
        self.goals.iter().filter(|g| !g.fulfilled)
    }

    pub fn progress_for(&self, goal_id: &str) -> Option<&GoalProgress> {
        self.goals.iter().find(|g| g.goal_id == goal_id)
    }
}

/// Everything the derivation reads, loaded once per computation.
#[derive(Debug, Clone, Default)]
pub struct DerivationInputs {
    pub assets: HashMap<String, Asset>,
    pub transactions: HashMap<String, Vec<Transaction>>,
    pub ledger: AllocationLedger,
}

impl DerivationInputs {
    /// Balance of `asset_id` at `at`, inclusive.
    pub fn balance_at(&self, asset_id: &str, at: DateTime<Utc>) -> Decimal {
        self.transactions
            .get(asset_id)
            .map(|txs| balance_at(txs, at))
            .unwrap_or(Decimal::ZERO)
    }

    /// Balance of `asset_id` just before `at`.
    pub fn balance_before(&self, asset_id: &str, at: DateTime<Utc>) -> Decimal {
        self.transactions
            .get(asset_id)
            .map(|txs| {
                txs.iter()
                    .filter(|t| t.timestamp < at)
                    .map(|t| t.amount)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }
}
