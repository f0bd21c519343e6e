use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::assets_model::{balance_at, Asset, Transaction};
use crate::errors::Result;

/// Trait defining the contract for Asset repository operations.
#[async_trait::async_trait]
pub trait AssetRepositoryTrait: Send + Sync {
    async fn create(&self, asset: Asset) -> Result<Asset>;
    fn get_by_id(&self, asset_id: &str) -> Result<Asset>;
    fn list(&self) -> Result<Vec<Asset>>;
    async fn delete(&self, asset_id: &str) -> Result<()>;
}

/// Append-only balance transaction feed (bank import, on-chain fetcher, ...).
pub trait TransactionSourceTrait: Send + Sync {
    /// Transactions for `asset_id` with `timestamp >= since`, oldest first.
    /// `None` lists the full history.
    fn list_transactions(
        &self,
        asset_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>>;

    /// Balance of `asset_id` at instant `at` (inclusive).
    fn balance_at(&self, asset_id: &str, at: DateTime<Utc>) -> Result<Decimal> {
        Ok(balance_at(&self.list_transactions(asset_id, None)?, at))
    }
}
