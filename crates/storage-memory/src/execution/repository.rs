use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use goalpace_core::execution::{
    CompletedExecution, ExecutionError, ExecutionRecord, ExecutionRepositoryTrait,
    ExecutionSnapshot,
};
use goalpace_core::utils::MonthLabel;
use goalpace_core::Result;
use log::debug;

use crate::errors::{duplicate, not_found, IntoCore};

const RECORDS: &str = "execution_records";
const SNAPSHOTS: &str = "execution_snapshots";
const COMPLETED: &str = "completed_executions";

#[derive(Default)]
struct Tables {
    /// Insertion order is creation order.
    records: Vec<ExecutionRecord>,
    snapshots: HashMap<String, ExecutionSnapshot>,
    completed: HashMap<String, CompletedExecution>,
}

impl Tables {
    /// Rejects a second non-closed record for `record`'s month.
    fn check_single_active(&self, record: &ExecutionRecord) -> Result<()> {
        if !record.is_active() {
            return Ok(());
        }
        let clash = self.records.iter().any(|r| {
            r.id != record.id && r.month_label == record.month_label && r.is_active()
        });
        if clash {
            return Err(ExecutionError::DuplicateActiveRecord {
                month: record.month_label,
            }
            .into());
        }
        Ok(())
    }
}

/// Month-keyed execution store.
///
/// All tables share one lock so that the one-non-closed-record check and
/// the write it guards are a single step.
#[derive(Default)]
pub struct ExecutionRepository {
    tables: RwLock<Tables>,
}

impl ExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionRepositoryTrait for ExecutionRepository {
    fn get_active_record(&self, month: MonthLabel) -> Result<Option<ExecutionRecord>> {
        Ok(self
            .tables
            .read()
            .into_core(RECORDS)?
            .records
            .iter()
            .find(|r| r.month_label == month && r.is_active())
            .cloned())
    }

    fn list_records(&self, month: MonthLabel) -> Result<Vec<ExecutionRecord>> {
        Ok(self
            .tables
            .read()
            .into_core(RECORDS)?
            .records
            .iter()
            .filter(|r| r.month_label == month)
            .cloned()
            .collect())
    }

    async fn insert_record(&self, record: ExecutionRecord) -> Result<ExecutionRecord> {
        let mut tables = self.tables.write().into_core(RECORDS)?;
        if tables.records.iter().any(|r| r.id == record.id) {
            return Err(duplicate(RECORDS, record.id));
        }
        tables.check_single_active(&record)?;
        tables.records.push(record.clone());
        debug!("Inserted execution record {} for {}", record.id, record.month_label);
        Ok(record)
    }

    async fn update_record(&self, record: ExecutionRecord) -> Result<ExecutionRecord> {
        let mut tables = self.tables.write().into_core(RECORDS)?;
        tables.check_single_active(&record)?;
        let slot = tables
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| not_found(RECORDS, record.id.clone()))?;
        *slot = record.clone();
        Ok(record)
    }

    fn get_snapshot(&self, record_id: &str) -> Result<Option<ExecutionSnapshot>> {
        Ok(self
            .tables
            .read()
            .into_core(SNAPSHOTS)?
            .snapshots
            .get(record_id)
            .cloned())
    }

    async fn insert_snapshot(&self, snapshot: ExecutionSnapshot) -> Result<ExecutionSnapshot> {
        let mut tables = self.tables.write().into_core(SNAPSHOTS)?;
        if tables.snapshots.contains_key(&snapshot.record_id) {
            return Err(duplicate(SNAPSHOTS, snapshot.record_id));
        }
        tables
            .snapshots
            .insert(snapshot.record_id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn delete_snapshot(&self, record_id: &str) -> Result<usize> {
        let removed = self
            .tables
            .write()
            .into_core(SNAPSHOTS)?
            .snapshots
            .remove(record_id);
        Ok(usize::from(removed.is_some()))
    }

    fn get_completed(&self, record_id: &str) -> Result<Option<CompletedExecution>> {
        Ok(self
            .tables
            .read()
            .into_core(COMPLETED)?
            .completed
            .get(record_id)
            .cloned())
    }

    async fn insert_completed(
        &self,
        completed: CompletedExecution,
    ) -> Result<CompletedExecution> {
        let mut tables = self.tables.write().into_core(COMPLETED)?;
        if tables.completed.contains_key(&completed.record_id) {
            return Err(duplicate(COMPLETED, completed.record_id));
        }
        tables
            .completed
            .insert(completed.record_id.clone(), completed.clone());
        Ok(completed)
    }

    async fn delete_completed(&self, record_id: &str) -> Result<usize> {
        let removed = self
            .tables
            .write()
            .into_core(COMPLETED)?
            .completed
            .remove(record_id);
        Ok(usize::from(removed.is_some()))
    }

    fn list_completed(&self, limit: usize, offset: usize) -> Result<Vec<CompletedExecution>> {
        let tables = self.tables.read().into_core(COMPLETED)?;
        let mut completed: Vec<&CompletedExecution> = tables.completed.values().collect();
        completed.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.month_label.cmp(&a.month_label))
        });
        Ok(completed
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
