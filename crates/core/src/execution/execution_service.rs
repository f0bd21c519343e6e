use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::execution_errors::ExecutionError;
use super::execution_model::{
    CompletedExecution, CompletedGoal, ExecutionRecord, ExecutionSnapshot, ExecutionStatus,
    Recalculation, SnapshotGoal,
};
use super::execution_traits::{ExecutionRepositoryTrait, ExecutionServiceTrait};
use crate::allocations::AllocationHistoryRepositoryTrait;
use crate::assets::{AssetRepositoryTrait, TransactionSourceTrait};
use crate::contributions::{
    asset_shortfalls, derive_contributions, evaluate_fulfillment, load_inputs,
    required_rate_pairs, DerivationInputs, DerivationWindow, GoalContribution, GoalRef,
    ProgressReport, RateBasisKind,
};
use crate::errors::{Error, Result};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink, RecalculationHandler};
use crate::flex::{QuickAction, RedistributionStrategy};
use crate::fx::{FxServiceTrait, RateBasis};
use crate::goals::GoalServiceTrait;
use crate::planning::{MonthlyPlan, PlanningServiceTrait};
use crate::settings::SettingsServiceTrait;
use crate::utils::{Clock, KeyedLocks, MonthLabel};

/// Drives the monthly `draft -> executing -> closed` lifecycle.
///
/// Transitions of one month are serialized by a per-month lock; reads
/// (plans, progress, history) take no lock.
pub struct ExecutionService {
    repository: Arc<dyn ExecutionRepositoryTrait>,
    planning: Arc<dyn PlanningServiceTrait>,
    goal_service: Arc<dyn GoalServiceTrait>,
    asset_repo: Arc<dyn AssetRepositoryTrait>,
    transactions: Arc<dyn TransactionSourceTrait>,
    history_repo: Arc<dyn AllocationHistoryRepositoryTrait>,
    fx_service: Arc<dyn FxServiceTrait>,
    settings_service: Arc<dyn SettingsServiceTrait>,
    clock: Arc<dyn Clock>,
    event_sink: Arc<dyn DomainEventSink>,
    month_locks: KeyedLocks<MonthLabel>,
}

impl ExecutionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn ExecutionRepositoryTrait>,
        planning: Arc<dyn PlanningServiceTrait>,
        goal_service: Arc<dyn GoalServiceTrait>,
        asset_repo: Arc<dyn AssetRepositoryTrait>,
        transactions: Arc<dyn TransactionSourceTrait>,
        history_repo: Arc<dyn AllocationHistoryRepositoryTrait>,
        fx_service: Arc<dyn FxServiceTrait>,
        settings_service: Arc<dyn SettingsServiceTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            planning,
            goal_service,
            asset_repo,
            transactions,
            history_repo,
            fx_service,
            settings_service,
            clock,
            event_sink: Arc::new(NoOpDomainEventSink),
            month_locks: KeyedLocks::new(),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// Month of the clock's current instant, in UTC.
    pub fn current_month(&self) -> MonthLabel {
        MonthLabel::from_datetime(self.clock.now())
    }

    fn report_invariant(err: Error) -> Error {
        if let Error::Execution(ExecutionError::DuplicateActiveRecord { month }) = &err {
            error!(
                "Invariant violated: second active execution record for {}",
                month
            );
        }
        err
    }

    /// Newest record of `month` regardless of status.
    fn latest_record(&self, month: MonthLabel) -> Result<Option<ExecutionRecord>> {
        if let Some(active) = self.repository.get_active_record(month)? {
            return Ok(Some(active));
        }
        Ok(self.repository.list_records(month)?.pop())
    }

    fn require_latest(&self, month: MonthLabel) -> Result<ExecutionRecord> {
        self.latest_record(month)?
            .ok_or_else(|| ExecutionError::RecordNotFound(month).into())
    }

    /// Caller must hold the month lock.
    async fn get_or_create_locked(&self, month: MonthLabel) -> Result<ExecutionRecord> {
        if let Some(active) = self.repository.get_active_record(month)? {
            return Ok(active);
        }
        let settings = self.settings_service.get_settings()?;
        let record = ExecutionRecord::new_draft(
            Uuid::new_v4().to_string(),
            month,
            self.clock.now(),
            settings.default_strategy,
        );
        let created = self
            .repository
            .insert_record(record)
            .await
            .map_err(Self::report_invariant)?;
        info!("Created draft execution record {} for {}", created.id, month);
        Ok(created)
    }

    fn load_inputs(&self) -> Result<DerivationInputs> {
        load_inputs(
            self.asset_repo.as_ref(),
            self.transactions.as_ref(),
            self.history_repo.as_ref(),
        )
    }

    fn started_at(record: &ExecutionRecord) -> Result<DateTime<Utc>> {
        record.started_at.ok_or_else(|| {
            ExecutionError::MissingSnapshot {
                month: record.month_label,
            }
            .into()
        })
    }

    fn require_snapshot(&self, record: &ExecutionRecord) -> Result<ExecutionSnapshot> {
        self.repository.get_snapshot(&record.id)?.ok_or_else(|| {
            ExecutionError::MissingSnapshot {
                month: record.month_label,
            }
            .into()
        })
    }

    fn require_completed(&self, record: &ExecutionRecord) -> Result<CompletedExecution> {
        self.repository.get_completed(&record.id)?.ok_or_else(|| {
            ExecutionError::MissingSnapshot {
                month: record.month_label,
            }
            .into()
        })
    }

    /// Progress of an executing record with the current rates.
    async fn live_progress(
        &self,
        record: &ExecutionRecord,
        snapshot: &ExecutionSnapshot,
        end: DateTime<Utc>,
    ) -> Result<ProgressReport> {
        let window = DerivationWindow::new(Self::started_at(record)?, end);
        let inputs = self.load_inputs()?;
        let refs = goal_refs(&snapshot.goals);
        let live = self
            .fx_service
            .get_live_rates(&required_rate_pairs(&inputs, &refs))
            .await;
        let contributions = derive_contributions(&inputs, &refs, window, RateBasis::Live(&live))?;
        let report = build_report(
            record.month_label,
            window,
            RateBasisKind::Live {
                stale: live.is_stale(),
            },
            &snapshot.goals,
            &contributions,
            &inputs,
        );
        Ok(report)
    }

    /// Removes a write-once artifact whose record update failed, so the
    /// transition can be retried.
    async fn discard_artifact<F>(&self, month: MonthLabel, delete: F)
    where
        F: std::future::Future<Output = Result<usize>>,
    {
        if let Err(e) = delete.await {
            error!(
                "Could not discard artifact of failed transition for {}: {}",
                month, e
            );
        }
    }

    fn emit_transition(&self, month: MonthLabel, from: ExecutionStatus, to: ExecutionStatus) {
        info!("Execution {} moved {} -> {}", month, from, to);
        self.event_sink
            .emit(DomainEvent::execution_transitioned(month, from, to));
    }
}

fn goal_refs(goals: &[SnapshotGoal]) -> Vec<GoalRef<'_>> {
    goals
        .iter()
        .map(|g| GoalRef {
            goal_id: &g.goal_id,
            currency: &g.currency,
        })
        .collect()
}

fn build_report(
    month: MonthLabel,
    window: DerivationWindow,
    basis: RateBasisKind,
    planned: &[SnapshotGoal],
    contributions: &[GoalContribution],
    inputs: &DerivationInputs,
) -> ProgressReport {
    let goals = planned
        .iter()
        .map(|goal| {
            let derived = contributions
                .iter()
                .find(|c| c.goal_id == goal.goal_id)
                .map(|c| c.derived_total)
                .unwrap_or(Decimal::ZERO);
            evaluate_fulfillment(
                &goal.goal_id,
                &goal.goal_name,
                &goal.currency,
                goal.planned_amount,
                derived,
            )
        })
        .collect();
    let mut events: Vec<_> = contributions
        .iter()
        .flat_map(|c| c.events.iter().cloned())
        .collect();
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    ProgressReport {
        month,
        window,
        basis,
        goals,
        shortfalls: asset_shortfalls(inputs, window.end),
        events,
    }
}

#[async_trait]
impl ExecutionServiceTrait for ExecutionService {
    async fn get_or_create(&self, month: MonthLabel) -> Result<ExecutionRecord> {
        let _guard = self.month_locks.lock(&month).await;
        self.get_or_create_locked(month).await
    }

    async fn get_current_plan(&self, month: MonthLabel) -> Result<MonthlyPlan> {
        let record = self.get_or_create(month).await?;
        let plan = self
            .planning
            .build_plan(record.flex_factor, record.strategy)
            .await?;
        Ok(MonthlyPlan { record, plan })
    }

    async fn commit_flex_adjustment(
        &self,
        month: MonthLabel,
        factor: Decimal,
        strategy: RedistributionStrategy,
    ) -> Result<ExecutionRecord> {
        let _guard = self.month_locks.lock(&month).await;
        let mut record = self.get_or_create_locked(month).await?;
        // validates the factor before anything is stored
        self.planning.build_plan(factor, strategy).await?;
        record.flex_factor = factor;
        record.strategy = strategy;
        let saved = self.repository.update_record(record).await?;
        debug!(
            "Committed flex factor {} ({}) for {}",
            factor,
            strategy.as_str(),
            month
        );
        Ok(saved)
    }

    async fn apply_quick_action(
        &self,
        month: MonthLabel,
        action: QuickAction,
    ) -> Result<MonthlyPlan> {
        self.goal_service.apply_quick_action(action).await?;
        if let Some(factor) = action.factor() {
            let record = self.get_or_create(month).await?;
            self.commit_flex_adjustment(month, factor, record.strategy)
                .await?;
        }
        self.get_current_plan(month).await
    }

    async fn start_executing(&self, month: MonthLabel) -> Result<ExecutionRecord> {
        let _guard = self.month_locks.lock(&month).await;
        let mut record = match self.latest_record(month)? {
            Some(record) if record.status == ExecutionStatus::Closed => {
                return Err(
                    ExecutionError::invalid_transition(month, record.status, "start").into(),
                );
            }
            Some(record) => record,
            None => self.get_or_create_locked(month).await?,
        };

        let settings = self.settings_service.get_settings()?;
        let now = self.clock.now();
        record.start(now, settings.undo_grace_period())?;

        let plan = self
            .planning
            .build_plan(record.flex_factor, record.strategy)
            .await?;
        let snapshot = ExecutionSnapshot {
            id: Uuid::new_v4().to_string(),
            record_id: record.id.clone(),
            month_label: month,
            captured_at: now,
            goals: plan
                .adjustments
                .adjustments
                .iter()
                .map(|a| SnapshotGoal {
                    goal_id: a.goal_id.clone(),
                    goal_name: a.goal_name.clone(),
                    planned_amount: a.adjusted_amount,
                    currency: a.currency.clone(),
                    flex_state: a.flex_state,
                })
                .collect(),
        };
        let snapshot = self.repository.insert_snapshot(snapshot).await?;
        let saved = match self.repository.update_record(record).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard_artifact(
                    month,
                    self.repository.delete_snapshot(&snapshot.record_id),
                )
                .await;
                return Err(e);
            }
        };
        debug!(
            "Snapshot {} captured {} goal(s) for {}",
            snapshot.id,
            snapshot.goals.len(),
            month
        );
        self.emit_transition(month, ExecutionStatus::Draft, ExecutionStatus::Executing);
        Ok(saved)
    }

    async fn complete(&self, month: MonthLabel) -> Result<ExecutionRecord> {
        let _guard = self.month_locks.lock(&month).await;
        let mut record = self.require_latest(month)?;
        if record.status != ExecutionStatus::Executing {
            return Err(
                ExecutionError::invalid_transition(month, record.status, "complete").into(),
            );
        }

        let snapshot = self.require_snapshot(&record)?;
        let started_at = Self::started_at(&record)?;
        let now = self.clock.now();

        // final read: freeze the current rates, then derive with exactly those
        let window = DerivationWindow::new(started_at, now);
        let inputs = self.load_inputs()?;
        let refs = goal_refs(&snapshot.goals);
        let live = self
            .fx_service
            .get_live_rates(&required_rate_pairs(&inputs, &refs))
            .await;
        if live.is_stale() {
            warn!(
                "Completing {} with stale exchange rates; they are frozen as-is",
                month
            );
        }
        let exchange_rates = live.freeze();
        let contributions = derive_contributions(
            &inputs,
            &refs,
            window,
            RateBasis::Frozen(&exchange_rates.to_table()),
        )?;
        let report = build_report(
            month,
            window,
            RateBasisKind::Frozen,
            &snapshot.goals,
            &contributions,
            &inputs,
        );

        let goals = snapshot
            .goals
            .iter()
            .map(|goal| {
                let progress = report.progress_for(&goal.goal_id);
                CompletedGoal {
                    goal_id: goal.goal_id.clone(),
                    goal_name: goal.goal_name.clone(),
                    currency: goal.currency.clone(),
                    flex_state: goal.flex_state,
                    planned_amount: goal.planned_amount,
                    actual_amount: progress.map(|p| p.derived_total).unwrap_or(Decimal::ZERO),
                    percent_complete: progress
                        .map(|p| p.percent_complete())
                        .unwrap_or(Decimal::ZERO),
                    fulfilled: progress.is_some_and(|p| p.fulfilled),
                }
            })
            .collect();

        let settings = self.settings_service.get_settings()?;
        record.complete(now, settings.undo_grace_period())?;
        let completed = CompletedExecution {
            id: Uuid::new_v4().to_string(),
            record_id: record.id.clone(),
            month_label: month,
            started_at,
            completed_at: now,
            exchange_rates,
            goals,
            contributions: report.events,
            shortfalls: report.shortfalls,
        };
        let completed = self.repository.insert_completed(completed).await?;
        let saved = match self.repository.update_record(record).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard_artifact(
                    month,
                    self.repository.delete_completed(&completed.record_id),
                )
                .await;
                return Err(e);
            }
        };
        info!(
            "Completed {}: {}/{} goal(s) fulfilled",
            month,
            completed.fulfilled_count(),
            completed.goals.len()
        );
        self.emit_transition(month, ExecutionStatus::Executing, ExecutionStatus::Closed);
        Ok(saved)
    }

    async fn undo(&self, month: MonthLabel) -> Result<ExecutionRecord> {
        let _guard = self.month_locks.lock(&month).await;
        let now = self.clock.now();
        let mut record = self.require_latest(month)?;

        if record.status == ExecutionStatus::Draft {
            // a fresh draft may shadow a closed record still inside its window
            let reopenable = self
                .repository
                .list_records(month)?
                .into_iter()
                .any(|r| r.status == ExecutionStatus::Closed && r.can_undo(now));
            if reopenable {
                return Err(Self::report_invariant(
                    ExecutionError::DuplicateActiveRecord { month }.into(),
                ));
            }
        }

        let settings = self.settings_service.get_settings()?;
        let from = record.revert(now, settings.undo_grace_period())?;
        match from {
            ExecutionStatus::Closed => {
                self.repository.delete_completed(&record.id).await?;
            }
            ExecutionStatus::Executing => {
                self.repository.delete_snapshot(&record.id).await?;
            }
            ExecutionStatus::Draft => {}
        }
        let saved = self
            .repository
            .update_record(record)
            .await
            .map_err(Self::report_invariant)?;
        self.emit_transition(month, from, saved.status);
        Ok(saved)
    }

    async fn recalculate(&self, month: MonthLabel) -> Result<Recalculation> {
        let record = self.require_latest(month)?;
        let progress = match record.status {
            ExecutionStatus::Closed => {
                return Err(
                    ExecutionError::invalid_transition(month, record.status, "recalculate")
                        .into(),
                );
            }
            ExecutionStatus::Draft => None,
            ExecutionStatus::Executing => {
                let snapshot = self.require_snapshot(&record)?;
                let report = self
                    .live_progress(&record, &snapshot, self.clock.now())
                    .await?;
                Some(report)
            }
        };
        let plan = self
            .planning
            .build_plan(record.flex_factor, record.strategy)
            .await?;
        if let Some(report) = &progress {
            debug!(
                "Recalculated {}: {} goal(s) still unfulfilled",
                month,
                report.unfulfilled().count()
            );
        }
        Ok(Recalculation {
            plan: MonthlyPlan { record, plan },
            progress,
        })
    }

    async fn get_progress(&self, month: MonthLabel) -> Result<ProgressReport> {
        let record = self.require_latest(month)?;
        match record.status {
            ExecutionStatus::Draft => Err(ExecutionError::invalid_transition(
                month,
                record.status,
                "show progress of",
            )
            .into()),
            ExecutionStatus::Executing => {
                let snapshot = self.require_snapshot(&record)?;
                let report = self
                    .live_progress(&record, &snapshot, self.clock.now())
                    .await?;
                Ok(report)
            }
            ExecutionStatus::Closed => {
                let completed = self.require_completed(&record)?;
                Ok(completed.to_progress_report())
            }
        }
    }

    fn get_history(
        &self,
        page_size: Option<usize>,
        offset: usize,
    ) -> Result<Vec<CompletedExecution>> {
        let limit = match page_size {
            Some(size) if size > 0 => size,
            _ => self.settings_service.get_settings()?.history_page_size,
        };
        self.repository.list_completed(limit, offset)
    }

    fn get_completed(&self, month: MonthLabel) -> Result<Option<CompletedExecution>> {
        let closed = self
            .repository
            .list_records(month)?
            .into_iter()
            .rev()
            .find(|r| r.status == ExecutionStatus::Closed);
        match closed {
            Some(record) => self.repository.get_completed(&record.id),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RecalculationHandler for ExecutionService {
    async fn handle_triggers(&self, triggers: &[DomainEvent]) -> Result<()> {
        let month = self.current_month();
        match self.recalculate(month).await {
            Ok(_) => {
                debug!(
                    "Recalculated {} after {} trigger(s)",
                    month,
                    triggers.len()
                );
                Ok(())
            }
            Err(Error::Execution(
                ExecutionError::RecordNotFound(_) | ExecutionError::InvalidTransition { .. },
            )) => {
                debug!("Nothing to recalculate for {}", month);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
