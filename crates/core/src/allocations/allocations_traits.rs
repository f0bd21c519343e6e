use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::allocations_ledger::AllocationLedger;
use super::allocations_model::{
    AllocationHistoryEntry, AllocationSplit, AllocationTarget, RoutingDecision,
};
use crate::assets::Transaction;
use crate::errors::Result;

/// Current allocation targets, one per (asset, goal) pair.
#[async_trait]
pub trait AllocationTargetRepositoryTrait: Send + Sync {
    fn list_targets(&self) -> Result<Vec<AllocationTarget>>;
    fn list_targets_for_asset(&self, asset_id: &str) -> Result<Vec<AllocationTarget>>;
    /// Inserts or replaces the target of `(target.asset_id, target.goal_id)`.
    async fn upsert_target(&self, target: AllocationTarget) -> Result<AllocationTarget>;
}

/// Append-only allocation history.
///
/// There is no update or delete: correcting a past allocation is a new
/// entry with a later timestamp. Appends for the same (asset, goal) pair are
/// serialized by the implementation.
#[async_trait]
pub trait AllocationHistoryRepositoryTrait: Send + Sync {
    async fn append(&self, entry: AllocationHistoryEntry) -> Result<AllocationHistoryEntry>;
    fn target_as_of(&self, asset_id: &str, goal_id: &str, at: DateTime<Utc>) -> Result<Decimal>;
    fn list_entries(&self) -> Result<Vec<AllocationHistoryEntry>>;
}

#[async_trait]
pub trait AllocationServiceTrait: Send + Sync {
    /// Sets the target of a pair and records the change in the history.
    async fn set_allocation_target(
        &self,
        asset_id: &str,
        goal_id: &str,
        amount: Decimal,
    ) -> Result<AllocationTarget>;
    /// Routes a newly arrived transaction. Only a fully dedicated asset moves
    /// its goal's target; anything else stays in the unallocated pool.
    async fn record_transaction(&self, transaction: &Transaction) -> Result<RoutingDecision>;
    fn get_targets_for_asset(&self, asset_id: &str) -> Result<Vec<AllocationTarget>>;
    fn unallocated_balance(&self, asset_id: &str) -> Result<Decimal>;
    /// Balance of `asset_id` at `at` split across its targets at that instant.
    fn split_at(&self, asset_id: &str, at: DateTime<Utc>) -> Result<AllocationSplit>;
    fn load_ledger(&self) -> Result<AllocationLedger>;
}
