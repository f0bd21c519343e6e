use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use goalpace_core::assets::{Asset, AssetRepositoryTrait, Transaction, TransactionSourceTrait};
use goalpace_core::Result;
use log::debug;

use crate::errors::{duplicate, not_found, IntoCore};

const ASSETS: &str = "assets";
const TRANSACTIONS: &str = "transactions";

#[derive(Default)]
pub struct AssetRepository {
    assets: RwLock<BTreeMap<String, Asset>>,
}

impl AssetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetRepositoryTrait for AssetRepository {
    async fn create(&self, asset: Asset) -> Result<Asset> {
        let mut assets = self.assets.write().into_core(ASSETS)?;
        if assets.contains_key(&asset.id) {
            return Err(duplicate(ASSETS, asset.id));
        }
        assets.insert(asset.id.clone(), asset.clone());
        Ok(asset)
    }

    fn get_by_id(&self, asset_id: &str) -> Result<Asset> {
        self.assets
            .read()
            .into_core(ASSETS)?
            .get(asset_id)
            .cloned()
            .ok_or_else(|| not_found(ASSETS, asset_id))
    }

    fn list(&self) -> Result<Vec<Asset>> {
        Ok(self.assets.read().into_core(ASSETS)?.values().cloned().collect())
    }

    async fn delete(&self, asset_id: &str) -> Result<()> {
        self.assets
            .write()
            .into_core(ASSETS)?
            .remove(asset_id)
            .map(|_| ())
            .ok_or_else(|| not_found(ASSETS, asset_id))
    }
}

/// Append-only transaction feed, kept in timestamp order per asset.
#[derive(Default)]
pub struct TransactionStore {
    by_asset: RwLock<BTreeMap<String, Vec<Transaction>>>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction reported by a feed. Ids are unique per asset.
    pub fn append(&self, transaction: Transaction) -> Result<Transaction> {
        let mut by_asset = self.by_asset.write().into_core(TRANSACTIONS)?;
        let feed = by_asset.entry(transaction.asset_id.clone()).or_default();
        if feed.iter().any(|t| t.id == transaction.id) {
            return Err(duplicate(TRANSACTIONS, transaction.id));
        }
        let at = feed.partition_point(|t| t.timestamp <= transaction.timestamp);
        feed.insert(at, transaction.clone());
        debug!(
            "Appended transaction {} ({}) to {}",
            transaction.id, transaction.amount, transaction.asset_id
        );
        Ok(transaction)
    }
}

impl TransactionSourceTrait for TransactionStore {
    fn list_transactions(
        &self,
        asset_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>> {
        let by_asset = self.by_asset.read().into_core(TRANSACTIONS)?;
        Ok(by_asset
            .get(asset_id)
            .map(|feed| {
                feed.iter()
                    .filter(|t| since.is_none_or(|s| t.timestamp >= s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
