//! Append-only allocation history, kept sorted per (asset, goal) pair.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::allocations_model::{AllocationHistoryEntry, AllocationKey};

/// History of one (asset, goal) pair ordered by `(timestamp, recorded_at)`,
/// then by append order.
#[derive(Debug, Clone, Default)]
pub struct AllocationSeries {
    entries: Vec<AllocationHistoryEntry>,
}

impl AllocationSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` after every entry that sorts at or before it, so a
    /// later append wins a tie.
    pub fn append(&mut self, entry: AllocationHistoryEntry) {
        let position = self
            .entries
            .partition_point(|e| (e.timestamp, e.recorded_at) <= (entry.timestamp, entry.recorded_at));
        self.entries.insert(position, entry);
    }

    /// Target in effect at `at`: the latest entry with `timestamp <= at`,
    /// or 0 when none exists.
    pub fn target_as_of(&self, at: DateTime<Utc>) -> Decimal {
        let end = self.entries.partition_point(|e| e.timestamp <= at);
        self.value_at(end)
    }

    /// Target in effect just before `at` (entries stamped exactly `at` excluded).
    pub fn target_before(&self, at: DateTime<Utc>) -> Decimal {
        let end = self.entries.partition_point(|e| e.timestamp < at);
        self.value_at(end)
    }

    /// Entries with `start <= timestamp <= end`, each paired with the target
    /// it replaced.
    pub fn changes_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<(&AllocationHistoryEntry, Decimal)> {
        let first = self.entries.partition_point(|e| e.timestamp < start);
        let last = self.entries.partition_point(|e| e.timestamp <= end);
        (first..last.max(first))
            .map(|i| (&self.entries[i], self.value_at(i)))
            .collect()
    }

    pub fn entries(&self) -> &[AllocationHistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&AllocationHistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn value_at(&self, end: usize) -> Decimal {
        if end == 0 {
            Decimal::ZERO
        } else {
            self.entries[end - 1].amount
        }
    }
}

/// Read model over the whole allocation history, used by the derivation
/// engine. Built from a repository listing; never written back.
#[derive(Debug, Clone, Default)]
pub struct AllocationLedger {
    series: BTreeMap<AllocationKey, AllocationSeries>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = AllocationHistoryEntry>) -> Self {
        let mut ledger = Self::new();
        for entry in entries {
            ledger.append(entry);
        }
        ledger
    }

    pub fn append(&mut self, entry: AllocationHistoryEntry) {
        self.series
            .entry(AllocationKey::from(&entry))
            .or_default()
            .append(entry);
    }

    pub fn series(&self, asset_id: &str, goal_id: &str) -> Option<&AllocationSeries> {
        self.series.get(&AllocationKey::new(asset_id, goal_id))
    }

    pub fn target_as_of(&self, asset_id: &str, goal_id: &str, at: DateTime<Utc>) -> Decimal {
        self.series(asset_id, goal_id)
            .map(|s| s.target_as_of(at))
            .unwrap_or(Decimal::ZERO)
    }

    /// Every goal's target on `asset_id` at `at`, ordered by goal id.
    /// Pairs whose target is 0 at that instant are omitted.
    pub fn targets_as_of(&self, asset_id: &str, at: DateTime<Utc>) -> Vec<(String, Decimal)> {
        self.targets_for_asset(asset_id, |series| series.target_as_of(at))
    }

    /// Like [`targets_as_of`](Self::targets_as_of) with `at` itself excluded.
    pub fn targets_before(&self, asset_id: &str, at: DateTime<Utc>) -> Vec<(String, Decimal)> {
        self.targets_for_asset(asset_id, |series| series.target_before(at))
    }

    /// Assets that have ever carried an allocation.
    pub fn asset_ids(&self) -> BTreeSet<String> {
        self.series.keys().map(|k| k.asset_id.clone()).collect()
    }

    /// Assets that have ever carried an allocation for `goal_id`.
    pub fn asset_ids_for_goal(&self, goal_id: &str) -> BTreeSet<String> {
        self.series
            .keys()
            .filter(|k| k.goal_id == goal_id)
            .map(|k| k.asset_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.series.values().map(AllocationSeries::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(AllocationSeries::is_empty)
    }

    fn targets_for_asset<F>(&self, asset_id: &str, value: F) -> Vec<(String, Decimal)>
    where
        F: Fn(&AllocationSeries) -> Decimal,
    {
        self.series
            .iter()
            .filter(|(key, _)| key.asset_id == asset_id)
            .map(|(key, series)| (key.goal_id.clone(), value(series)))
            .filter(|(_, amount)| !amount.is_zero())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn entry(id: &str, amount: Decimal, timestamp: DateTime<Utc>) -> AllocationHistoryEntry {
        AllocationHistoryEntry {
            id: id.to_string(),
            asset_id: "btc".to_string(),
            goal_id: "house".to_string(),
            amount,
            timestamp,
            recorded_at: timestamp,
            source_transaction_id: None,
        }
    }

    #[test]
    fn test_target_as_of_picks_latest_entry_at_or_before() {
        let mut series = AllocationSeries::new();
        series.append(entry("a", dec!(100), at(10)));
        series.append(entry("b", dec!(250), at(12)));

        assert_eq!(series.target_as_of(at(9)), Decimal::ZERO);
        assert_eq!(series.target_as_of(at(10)), dec!(100));
        assert_eq!(series.target_as_of(at(11)), dec!(100));
        assert_eq!(series.target_as_of(at(12)), dec!(250));
        assert_eq!(series.target_before(at(12)), dec!(100));
    }

    #[test]
    fn test_out_of_order_append_is_sorted() {
        let mut series = AllocationSeries::new();
        series.append(entry("late", dec!(300), at(15)));
        series.append(entry("early", dec!(50), at(8)));

        assert_eq!(series.entries()[0].id, "early");
        assert_eq!(series.target_as_of(at(9)), dec!(50));
        assert_eq!(series.latest().map(|e| e.id.as_str()), Some("late"));
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_recorded_at() {
        let mut first = entry("first", dec!(10), at(10));
        first.recorded_at = at(11);
        let mut second = entry("second", dec!(20), at(10));
        second.recorded_at = at(10) + Duration::minutes(30);

        let mut series = AllocationSeries::new();
        series.append(first);
        series.append(second);

        // recorded later wins even though appended first
        assert_eq!(series.target_as_of(at(10)), dec!(10));
    }

    #[test]
    fn test_identical_stamps_resolve_to_last_appended() {
        let mut series = AllocationSeries::new();
        series.append(entry("one", dec!(1), at(10)));
        series.append(entry("two", dec!(2), at(10)));
        assert_eq!(series.target_as_of(at(10)), dec!(2));
    }

    #[test]
    fn test_changes_between_reports_previous_values() {
        let mut series = AllocationSeries::new();
        series.append(entry("a", dec!(100), at(8)));
        series.append(entry("b", dec!(150), at(10)));
        series.append(entry("c", dec!(120), at(12)));
        series.append(entry("d", dec!(500), at(20)));

        let changes = series.changes_between(at(10), at(12));
        let summary: Vec<(&str, Decimal, Decimal)> = changes
            .iter()
            .map(|(e, previous)| (e.id.as_str(), *previous, e.amount))
            .collect();
        assert_eq!(
            summary,
            vec![("b", dec!(100), dec!(150)), ("c", dec!(150), dec!(120))]
        );
    }

    #[test]
    fn test_ledger_groups_by_pair() {
        let mut other_goal = entry("x", dec!(7), at(9));
        other_goal.goal_id = "car".to_string();
        let ledger = AllocationLedger::from_entries(vec![entry("a", dec!(3), at(9)), other_goal]);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.target_as_of("btc", "car", at(10)), dec!(7));
        assert_eq!(ledger.target_as_of("eth", "car", at(10)), Decimal::ZERO);
        assert_eq!(
            ledger.targets_as_of("btc", at(10)),
            vec![("car".to_string(), dec!(7)), ("house".to_string(), dec!(3))]
        );
        assert!(ledger.targets_before("btc", at(9)).is_empty());
        assert_eq!(ledger.asset_ids_for_goal("car").len(), 1);
    }
}
