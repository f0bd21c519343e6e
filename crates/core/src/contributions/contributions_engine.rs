//! Contribution derivation.
//!
//! Nothing here writes a contribution. A goal's progress over a window is
//! the change in its effective allocation between the window's bounds,
//! reconstructed from the allocation history and the transaction feed, and
//! converted with whichever rates the caller's [`RateBasis`] supplies.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;

use super::contributions_model::{
    AssetShortfall, ContributionEvent, ContributionSource, DerivationInputs, DerivationWindow,
    GoalContribution, GoalProgress,
};
use crate::allocations::{split_balance, AllocationHistoryRepositoryTrait, AllocationLedger};
use crate::assets::{AssetRepositoryTrait, TransactionSourceTrait};
use crate::errors::Result;
use crate::fx::{FxError, LiveRates, RateBasis};

/// A goal as seen by the derivation: its id and the currency it is tracked in.
#[derive(Debug, Clone, Copy)]
pub struct GoalRef<'a> {
    pub goal_id: &'a str,
    pub currency: &'a str,
}

/// Reads the asset list, every asset's transactions, and the allocation history.
pub fn load_inputs(
    assets: &dyn AssetRepositoryTrait,
    transactions: &dyn TransactionSourceTrait,
    history: &dyn AllocationHistoryRepositoryTrait,
) -> Result<DerivationInputs> {
    let ledger = AllocationLedger::from_entries(history.list_entries()?);
    let mut by_asset = HashMap::new();
    let mut asset_map = HashMap::new();
    for asset in assets.list()? {
        by_asset.insert(asset.id.clone(), transactions.list_transactions(&asset.id, None)?);
        asset_map.insert(asset.id.clone(), asset);
    }
    Ok(DerivationInputs {
        assets: asset_map,
        transactions: by_asset,
        ledger,
    })
}

/// Currency pairs (asset currency -> goal currency) the derivation will ask for.
pub fn required_rate_pairs(inputs: &DerivationInputs, goals: &[GoalRef<'_>]) -> Vec<(String, String)> {
    let mut pairs = BTreeSet::new();
    for goal in goals {
        for asset_id in inputs.ledger.asset_ids_for_goal(goal.goal_id) {
            if let Some(asset) = inputs.assets.get(&asset_id) {
                if asset.currency != goal.currency {
                    pairs.insert((asset.currency.clone(), goal.currency.to_string()));
                }
            }
        }
    }
    pairs.into_iter().collect()
}

/// Effective allocation of `goal_id` on `asset_id` at `at` (inclusive).
pub fn effective_allocation(
    inputs: &DerivationInputs,
    asset_id: &str,
    goal_id: &str,
    at: DateTime<Utc>,
) -> Decimal {
    split_balance(
        inputs.balance_at(asset_id, at),
        &inputs.ledger.targets_as_of(asset_id, at),
    )
    .effective_for(goal_id)
}

fn effective_allocation_before(
    inputs: &DerivationInputs,
    asset_id: &str,
    goal_id: &str,
    at: DateTime<Utc>,
) -> Decimal {
    split_balance(
        inputs.balance_before(asset_id, at),
        &inputs.ledger.targets_before(asset_id, at),
    )
    .effective_for(goal_id)
}

fn conversion_rate(
    basis: &RateBasis<'_>,
    from: &str,
    to: &str,
) -> std::result::Result<Decimal, FxError> {
    basis.rate(from, to).ok_or_else(|| {
        FxError::unavailable(
            from,
            to,
            match basis {
                RateBasis::Live(_) => "no live or cached rate",
                RateBasis::Frozen(_) => "rate was not frozen at completion",
            },
        )
    })
}

/// Derives each goal's contribution over `window`.
///
/// Fails only when a needed conversion rate is unknown; a partial aggregate
/// is never returned.
pub fn derive_contributions(
    inputs: &DerivationInputs,
    goals: &[GoalRef<'_>],
    window: DerivationWindow,
    basis: RateBasis<'_>,
) -> std::result::Result<Vec<GoalContribution>, FxError> {
    let mut contributions = Vec::with_capacity(goals.len());

    for goal in goals {
        let mut events = Vec::new();
        let mut derived_total = Decimal::ZERO;

        for asset_id in inputs.ledger.asset_ids_for_goal(goal.goal_id) {
            let Some(asset) = inputs.assets.get(&asset_id) else {
                warn!(
                    "Allocation history references unknown asset {}; ignoring it for goal {}",
                    asset_id, goal.goal_id
                );
                continue;
            };

            let before = effective_allocation_before(inputs, &asset_id, goal.goal_id, window.start);
            let after = effective_allocation(inputs, &asset_id, goal.goal_id, window.end);
            let native_delta = after - before;

            let mut lines: Vec<(ContributionSource, DateTime<Utc>, Decimal)> = Vec::new();
            if let Some(series) = inputs.ledger.series(&asset_id, goal.goal_id) {
                for (entry, previous) in series.changes_between(window.start, window.end) {
                    let change = entry.amount - previous;
                    if change.is_zero() {
                        continue;
                    }
                    let source = match &entry.source_transaction_id {
                        Some(transaction_id) => ContributionSource::Transaction {
                            transaction_id: transaction_id.clone(),
                        },
                        None => ContributionSource::Allocation {
                            entry_id: entry.id.clone(),
                        },
                    };
                    lines.push((source, entry.timestamp, change));
                }
            }
            let explained: Decimal = lines.iter().map(|(_, _, amount)| *amount).sum();
            let unexplained = native_delta - explained;
            if !unexplained.is_zero() {
                lines.push((ContributionSource::BalanceAdjustment, window.end, unexplained));
            }
            if lines.is_empty() {
                continue;
            }

            let rate = conversion_rate(&basis, &asset.currency, goal.currency)?;
            derived_total += native_delta * rate;
            events.extend(lines.into_iter().map(|(source, timestamp, amount)| {
                ContributionEvent {
                    source,
                    asset_id: asset_id.clone(),
                    goal_id: goal.goal_id.to_string(),
                    timestamp,
                    native_amount: amount,
                    native_currency: asset.currency.clone(),
                    goal_amount: amount * rate,
                    goal_currency: goal.currency.to_string(),
                }
            }));
        }

        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        debug!(
            "Goal {} derived {} {} from {} event(s)",
            goal.goal_id,
            derived_total,
            goal.currency,
            events.len()
        );
        contributions.push(GoalContribution {
            goal_id: goal.goal_id.to_string(),
            currency: goal.currency.to_string(),
            derived_total,
            events,
        });
    }

    Ok(contributions)
}

/// Total currently allocated to each goal, converted with live rates.
///
/// Used for planning, which must always render: an asset whose rate is
/// unknown contributes 0 and marks the result stale.
pub fn current_totals(
    inputs: &DerivationInputs,
    goals: &[GoalRef<'_>],
    at: DateTime<Utc>,
    live: &LiveRates,
) -> (HashMap<String, Decimal>, bool) {
    let basis = RateBasis::Live(live);
    let mut stale = basis.is_stale();
    let mut totals = HashMap::with_capacity(goals.len());

    for goal in goals {
        let mut total = Decimal::ZERO;
        for asset_id in inputs.ledger.asset_ids_for_goal(goal.goal_id) {
            let Some(asset) = inputs.assets.get(&asset_id) else {
                continue;
            };
            let effective = effective_allocation(inputs, &asset_id, goal.goal_id, at);
            if effective.is_zero() {
                continue;
            }
            match basis.rate(&asset.currency, goal.currency) {
                Some(rate) => total += effective * rate,
                None => {
                    warn!(
                        "No rate {}/{}; {} on {} left out of goal {} total",
                        asset.currency, goal.currency, effective, asset_id, goal.goal_id
                    );
                    stale = true;
                }
            }
        }
        totals.insert(goal.goal_id.to_string(), total);
    }

    (totals, stale)
}

/// Assets whose targets exceed their balance at `at`.
pub fn asset_shortfalls(inputs: &DerivationInputs, at: DateTime<Utc>) -> Vec<AssetShortfall> {
    inputs
        .ledger
        .asset_ids()
        .into_iter()
        .filter_map(|asset_id| {
            let split = split_balance(
                inputs.balance_at(&asset_id, at),
                &inputs.ledger.targets_as_of(&asset_id, at),
            );
            if !split.is_over_allocated() {
                return None;
            }
            let currency = inputs
                .assets
                .get(&asset_id)
                .map(|a| a.currency.clone())
                .unwrap_or_default();
            Some(AssetShortfall {
                asset_id,
                currency,
                balance: split.balance,
                total_targets: split.total_targets,
                shortfall: split.shortfall,
            })
        })
        .collect()
}

/// A goal is fulfilled once its derived total reaches its planned amount.
pub fn evaluate_fulfillment(
    goal_id: &str,
    goal_name: &str,
    currency: &str,
    planned_amount: Decimal,
    derived_total: Decimal,
) -> GoalProgress {
    GoalProgress {
        goal_id: goal_id.to_string(),
        goal_name: goal_name.to_string(),
        currency: currency.to_string(),
        planned_amount,
        derived_total,
        fulfilled: derived_total >= planned_amount,
    }
}
