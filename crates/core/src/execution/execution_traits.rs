use async_trait::async_trait;
use rust_decimal::Decimal;

use super::execution_model::{
    CompletedExecution, ExecutionRecord, ExecutionSnapshot, Recalculation,
};
use crate::contributions::ProgressReport;
use crate::errors::Result;
use crate::flex::{QuickAction, RedistributionStrategy};
use crate::planning::MonthlyPlan;
use crate::utils::MonthLabel;

/// Persistence of execution records and their write-once artifacts.
///
/// Implementations must refuse to hold two non-closed records for the same
/// month (`ExecutionError::DuplicateActiveRecord`), both on insert and on an
/// update that reopens a closed record.
#[async_trait]
pub trait ExecutionRepositoryTrait: Send + Sync {
    /// The draft or executing record of `month`, if any.
    fn get_active_record(&self, month: MonthLabel) -> Result<Option<ExecutionRecord>>;
    /// Every record of `month`, oldest first.
    fn list_records(&self, month: MonthLabel) -> Result<Vec<ExecutionRecord>>;
    async fn insert_record(&self, record: ExecutionRecord) -> Result<ExecutionRecord>;
    async fn update_record(&self, record: ExecutionRecord) -> Result<ExecutionRecord>;

    fn get_snapshot(&self, record_id: &str) -> Result<Option<ExecutionSnapshot>>;
    /// Fails with `StorageError::UniqueViolation` if the record already has one.
    async fn insert_snapshot(&self, snapshot: ExecutionSnapshot) -> Result<ExecutionSnapshot>;
    async fn delete_snapshot(&self, record_id: &str) -> Result<usize>;

    fn get_completed(&self, record_id: &str) -> Result<Option<CompletedExecution>>;
    /// Fails with `StorageError::UniqueViolation` if the record already has one.
    async fn insert_completed(&self, completed: CompletedExecution) -> Result<CompletedExecution>;
    async fn delete_completed(&self, record_id: &str) -> Result<usize>;
    /// Completed executions, most recently completed first.
    fn list_completed(&self, limit: usize, offset: usize) -> Result<Vec<CompletedExecution>>;
}

#[async_trait]
pub trait ExecutionServiceTrait: Send + Sync {
    /// The month's non-closed record, creating a draft if there is none.
    async fn get_or_create(&self, month: MonthLabel) -> Result<ExecutionRecord>;
    async fn get_current_plan(&self, month: MonthLabel) -> Result<MonthlyPlan>;
    /// Stores the global flex factor and strategy used by the month's plan.
    async fn commit_flex_adjustment(
        &self,
        month: MonthLabel,
        factor: Decimal,
        strategy: RedistributionStrategy,
    ) -> Result<ExecutionRecord>;
    async fn apply_quick_action(&self, month: MonthLabel, action: QuickAction)
        -> Result<MonthlyPlan>;

    async fn start_executing(&self, month: MonthLabel) -> Result<ExecutionRecord>;
    async fn complete(&self, month: MonthLabel) -> Result<ExecutionRecord>;
    async fn undo(&self, month: MonthLabel) -> Result<ExecutionRecord>;
    async fn recalculate(&self, month: MonthLabel) -> Result<Recalculation>;

    async fn get_progress(&self, month: MonthLabel) -> Result<ProgressReport>;
    /// Completed months, newest first. `None` uses the configured page size.
    fn get_history(&self, page_size: Option<usize>, offset: usize)
        -> Result<Vec<CompletedExecution>>;
    fn get_completed(&self, month: MonthLabel) -> Result<Option<CompletedExecution>>;
}
