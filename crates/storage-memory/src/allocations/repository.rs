use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use goalpace_core::allocations::{
    AllocationHistoryEntry, AllocationHistoryRepositoryTrait, AllocationKey, AllocationSeries,
    AllocationTarget, AllocationTargetRepositoryTrait,
};
use goalpace_core::Result;
use log::debug;
use rust_decimal::Decimal;

use crate::errors::{duplicate, IntoCore};

const TARGETS: &str = "allocation_targets";
const HISTORY: &str = "allocation_history";

#[derive(Default)]
pub struct AllocationTargetRepository {
    targets: RwLock<BTreeMap<AllocationKey, AllocationTarget>>,
}

impl AllocationTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AllocationTargetRepositoryTrait for AllocationTargetRepository {
    fn list_targets(&self) -> Result<Vec<AllocationTarget>> {
        Ok(self
            .targets
            .read()
            .into_core(TARGETS)?
            .values()
            .cloned()
            .collect())
    }

    fn list_targets_for_asset(&self, asset_id: &str) -> Result<Vec<AllocationTarget>> {
        Ok(self
            .targets
            .read()
            .into_core(TARGETS)?
            .values()
            .filter(|t| t.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn upsert_target(&self, target: AllocationTarget) -> Result<AllocationTarget> {
        let key = AllocationKey::new(&target.asset_id, &target.goal_id);
        let mut targets = self.targets.write().into_core(TARGETS)?;
        let stored = match targets.get(&key) {
            // the pair keeps its original id
            Some(existing) => AllocationTarget {
                id: existing.id.clone(),
                ..target
            },
            None => target,
        };
        targets.insert(key, stored.clone());
        Ok(stored)
    }
}

/// History ledger keyed by (asset, goal).
///
/// Appends to one pair hold that pair's shard lock, so concurrent writers
/// of the same pair are serialized while other pairs proceed.
#[derive(Default)]
pub struct AllocationHistoryRepository {
    series: DashMap<AllocationKey, AllocationSeries>,
}

impl AllocationHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AllocationHistoryRepositoryTrait for AllocationHistoryRepository {
    async fn append(&self, entry: AllocationHistoryEntry) -> Result<AllocationHistoryEntry> {
        let key = AllocationKey::from(&entry);
        let mut series = self.series.entry(key).or_default();
        if series.entries().iter().any(|e| e.id == entry.id) {
            return Err(duplicate(HISTORY, entry.id));
        }
        series.append(entry.clone());
        debug!(
            "Allocation {}/{} set to {} as of {}",
            entry.asset_id, entry.goal_id, entry.amount, entry.timestamp
        );
        Ok(entry)
    }

    fn target_as_of(&self, asset_id: &str, goal_id: &str, at: DateTime<Utc>) -> Result<Decimal> {
        Ok(self
            .series
            .get(&AllocationKey::new(asset_id, goal_id))
            .map(|series| series.target_as_of(at))
            .unwrap_or(Decimal::ZERO))
    }

    fn list_entries(&self) -> Result<Vec<AllocationHistoryEntry>> {
        let mut entries: Vec<AllocationHistoryEntry> = self
            .series
            .iter()
            .flat_map(|series| series.entries().to_vec())
            .collect();
        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.recorded_at.cmp(&b.recorded_at))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn entry(id: &str, amount: Decimal, at: DateTime<Utc>) -> AllocationHistoryEntry {
        AllocationHistoryEntry {
            id: id.to_string(),
            asset_id: "btc".to_string(),
            goal_id: "house".to_string(),
            amount,
            timestamp: at,
            recorded_at: at,
            source_transaction_id: None,
        }
    }

    #[tokio::test]
    async fn test_target_as_of_uses_latest_entry_at_or_before() {
        let repo = AllocationHistoryRepository::new();
        repo.append(entry("1", dec!(0.5), t0())).await.unwrap();
        repo.append(entry("2", dec!(0.8), t0() + Duration::days(10)))
            .await
            .unwrap();

        assert_eq!(
            repo.target_as_of("btc", "house", t0() - Duration::seconds(1))
                .unwrap(),
            Decimal::ZERO
        );
        assert_eq!(repo.target_as_of("btc", "house", t0()).unwrap(), dec!(0.5));
        assert_eq!(
            repo.target_as_of("btc", "house", t0() + Duration::days(20))
                .unwrap(),
            dec!(0.8)
        );
        assert_eq!(repo.target_as_of("btc", "car", t0()).unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_backdated_correction_is_an_append() {
        let repo = AllocationHistoryRepository::new();
        repo.append(entry("1", dec!(1.0), t0())).await.unwrap();
        let mut correction = entry("2", dec!(0.7), t0() + Duration::days(1));
        correction.recorded_at = t0() + Duration::days(5);
        repo.append(correction).await.unwrap();

        assert_eq!(repo.list_entries().unwrap().len(), 2);
        assert_eq!(
            repo.target_as_of("btc", "house", t0() + Duration::days(2))
                .unwrap(),
            dec!(0.7)
        );
        assert!(repo.append(entry("1", dec!(3), t0())).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_to_one_pair_are_all_kept() {
        let repo = Arc::new(AllocationHistoryRepository::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.append(entry(
                    &format!("e{}", i),
                    Decimal::from(i),
                    t0() + Duration::minutes(i),
                ))
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(repo.list_entries().unwrap().len(), 16);
        assert_eq!(
            repo.target_as_of("btc", "house", t0() + Duration::hours(1))
                .unwrap(),
            dec!(15)
        );
    }

    #[tokio::test]
    async fn test_upsert_keeps_pair_id() {
        let repo = AllocationTargetRepository::new();
        let target = AllocationTarget {
            id: "first".to_string(),
            asset_id: "btc".to_string(),
            goal_id: "house".to_string(),
            amount: dec!(1),
            updated_at: t0(),
        };
        repo.upsert_target(target.clone()).await.unwrap();
        let updated = repo
            .upsert_target(AllocationTarget {
                id: "second".to_string(),
                amount: dec!(2),
                ..target
            })
            .await
            .unwrap();
        assert_eq!(updated.id, "first");
        assert_eq!(repo.list_targets_for_asset("btc").unwrap()[0].amount, dec!(2));
        assert!(repo.list_targets_for_asset("eth").unwrap().is_empty());
    }
}
