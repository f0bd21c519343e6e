use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::allocations_ledger::AllocationLedger;
use super::allocations_model::{
    split_balance, AllocationHistoryEntry, AllocationSplit, AllocationTarget, RoutingDecision,
};
use super::allocations_traits::{
    AllocationHistoryRepositoryTrait, AllocationServiceTrait, AllocationTargetRepositoryTrait,
};
use crate::assets::{AssetRepositoryTrait, Transaction, TransactionSourceTrait};
use crate::errors::{Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::utils::{Clock, KeyedLocks};

pub struct AllocationService {
    asset_repo: Arc<dyn AssetRepositoryTrait>,
    transactions: Arc<dyn TransactionSourceTrait>,
    target_repo: Arc<dyn AllocationTargetRepositoryTrait>,
    history_repo: Arc<dyn AllocationHistoryRepositoryTrait>,
    clock: Arc<dyn Clock>,
    event_sink: Arc<dyn DomainEventSink>,
    asset_locks: KeyedLocks<String>,
}

impl AllocationService {
    pub fn new(
        asset_repo: Arc<dyn AssetRepositoryTrait>,
        transactions: Arc<dyn TransactionSourceTrait>,
        target_repo: Arc<dyn AllocationTargetRepositoryTrait>,
        history_repo: Arc<dyn AllocationHistoryRepositoryTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            asset_repo,
            transactions,
            target_repo,
            history_repo,
            clock,
            event_sink: Arc::new(NoOpDomainEventSink),
            asset_locks: KeyedLocks::new(),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// Balance of the asset just before `transaction`, excluding it even if
    /// the feed already lists it.
    fn balance_before(&self, transaction: &Transaction) -> Result<Decimal> {
        Ok(self
            .transactions
            .list_transactions(&transaction.asset_id, None)?
            .iter()
            .filter(|t| t.id != transaction.id && t.timestamp <= transaction.timestamp)
            .map(|t| t.amount)
            .sum())
    }

    async fn write_target(
        &self,
        existing: Option<&AllocationTarget>,
        asset_id: &str,
        goal_id: &str,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        source_transaction_id: Option<String>,
    ) -> Result<(AllocationTarget, AllocationHistoryEntry)> {
        let now = self.clock.now();
        let target = AllocationTarget {
            id: existing
                .map(|t| t.id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            asset_id: asset_id.to_string(),
            goal_id: goal_id.to_string(),
            amount,
            updated_at: now,
        };
        let entry = AllocationHistoryEntry {
            id: Uuid::new_v4().to_string(),
            asset_id: asset_id.to_string(),
            goal_id: goal_id.to_string(),
            amount,
            timestamp,
            recorded_at: now,
            source_transaction_id,
        };
        let target = self.target_repo.upsert_target(target).await?;
        let entry = self.history_repo.append(entry).await?;
        Ok((target, entry))
    }
}

/// Decides how a transaction is routed given the asset's targets and its
/// balance before the transaction.
fn route(targets: &[AllocationTarget], balance_before: Decimal) -> Option<&AllocationTarget> {
    let earmarked: Vec<&AllocationTarget> = targets
        .iter()
        .filter(|t| t.amount > Decimal::ZERO)
        .collect();
    // a lone pair at zero still marks the asset as dedicated to that goal
    let candidates = if earmarked.is_empty() && targets.len() == 1 {
        vec![&targets[0]]
    } else {
        earmarked
    };
    match candidates.as_slice() {
        [only] if only.amount >= balance_before => Some(only),
        _ => None,
    }
}

#[async_trait]
impl AllocationServiceTrait for AllocationService {
    async fn set_allocation_target(
        &self,
        asset_id: &str,
        goal_id: &str,
        amount: Decimal,
    ) -> Result<AllocationTarget> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Allocation target for {} on {} must not be negative",
                goal_id, asset_id
            ))
            .into());
        }
        self.asset_repo.get_by_id(asset_id)?;

        let _guard = self.asset_locks.lock(&asset_id.to_string()).await;
        let existing = self.target_repo.list_targets_for_asset(asset_id)?;
        let current = existing.iter().find(|t| t.goal_id == goal_id);
        let now = self.clock.now();
        let (target, _) = self
            .write_target(current, asset_id, goal_id, amount, now, None)
            .await?;

        debug!(
            "Allocation target {}/{} set to {}",
            asset_id, goal_id, amount
        );
        self.event_sink.emit(DomainEvent::allocations_changed(
            asset_id.to_string(),
            vec![goal_id.to_string()],
        ));
        Ok(target)
    }

    async fn record_transaction(&self, transaction: &Transaction) -> Result<RoutingDecision> {
        let _guard = self.asset_locks.lock(&transaction.asset_id).await;
        let targets = self.target_repo.list_targets_for_asset(&transaction.asset_id)?;
        let balance_before = self.balance_before(transaction)?;

        let decision = if targets.is_empty() {
            RoutingDecision::Unallocated
        } else if let Some(dedicated) = route(&targets, balance_before) {
            let amount = (dedicated.amount + transaction.amount).max(Decimal::ZERO);
            let goal_id = dedicated.goal_id.clone();
            let (_, entry) = self
                .write_target(
                    Some(dedicated),
                    &transaction.asset_id,
                    &goal_id,
                    amount,
                    transaction.timestamp,
                    Some(transaction.id.clone()),
                )
                .await?;
            info!(
                "Transaction {} routed to goal {} (target now {})",
                transaction.id, goal_id, amount
            );
            RoutingDecision::Dedicated { goal_id, entry }
        } else {
            let total: Decimal = targets.iter().map(|t| t.amount).sum();
            if total < balance_before {
                RoutingDecision::Partial
            } else {
                RoutingDecision::Shared
            }
        };

        if !matches!(decision, RoutingDecision::Dedicated { .. }) {
            debug!(
                "Transaction {} on {} left unallocated ({:?})",
                transaction.id, transaction.asset_id, decision
            );
        }
        self.event_sink
            .emit(DomainEvent::assets_changed(vec![transaction.asset_id.clone()]));
        Ok(decision)
    }

    fn get_targets_for_asset(&self, asset_id: &str) -> Result<Vec<AllocationTarget>> {
        self.target_repo.list_targets_for_asset(asset_id)
    }

    fn unallocated_balance(&self, asset_id: &str) -> Result<Decimal> {
        let split = self.split_at(asset_id, self.clock.now())?;
        Ok(split.unallocated())
    }

    fn split_at(&self, asset_id: &str, at: DateTime<Utc>) -> Result<AllocationSplit> {
        let balance = self.transactions.balance_at(asset_id, at)?;
        let ledger = self.load_ledger()?;
        Ok(split_balance(balance, &ledger.targets_as_of(asset_id, at)))
    }

    fn load_ledger(&self) -> Result<AllocationLedger> {
        Ok(AllocationLedger::from_entries(self.history_repo.list_entries()?))
    }
}
