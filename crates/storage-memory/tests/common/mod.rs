//! Wiring shared by the end-to-end tests: every core service on top of the
//! in-process stores, driven by a settable clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use goalpace_core::allocations::{AllocationService, AllocationServiceTrait, RoutingDecision};
use goalpace_core::assets::{Asset, AssetKind, AssetRepositoryTrait, Transaction};
use goalpace_core::events::CollectingDomainEventSink;
use goalpace_core::execution::ExecutionService;
use goalpace_core::fx::FxService;
use goalpace_core::goals::{Goal, GoalService, GoalServiceTrait, NewGoal};
use goalpace_core::planning::PlanningService;
use goalpace_core::settings::SettingsService;
use goalpace_core::utils::{Clock, FixedClock, MonthLabel};
use goalpace_storage_memory::{
    AllocationHistoryRepository, AllocationTargetRepository, AssetRepository,
    ExecutionRepository, FlexPreferenceRepository, GoalRepository, ManualRateSource,
    SettingsRepository, TransactionStore,
};
use rust_decimal::Decimal;

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub events: Arc<CollectingDomainEventSink>,
    pub assets: Arc<AssetRepository>,
    pub transactions: Arc<TransactionStore>,
    pub rates: Arc<ManualRateSource>,
    pub executions: Arc<ExecutionRepository>,
    pub goals: Arc<GoalService>,
    pub allocations: Arc<AllocationService>,
    pub planning: Arc<PlanningService>,
    pub execution: Arc<ExecutionService>,
    tx_seq: std::sync::atomic::AtomicUsize,
}

/// 2024-05-02 09:00 UTC; a deadline at the end of May is one month away.
pub fn may_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()
}

pub fn may() -> MonthLabel {
    "2024-05".parse().unwrap()
}

pub fn end_of_may() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
}

impl Harness {
    pub fn new() -> Self {
        Self::starting_at(may_start())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let clock = Arc::new(FixedClock::new(now));
        let events = Arc::new(CollectingDomainEventSink::new());

        let assets = Arc::new(AssetRepository::new());
        let transactions = Arc::new(TransactionStore::new());
        let targets = Arc::new(AllocationTargetRepository::new());
        let history = Arc::new(AllocationHistoryRepository::new());
        let executions = Arc::new(ExecutionRepository::new());
        let rates = Arc::new(ManualRateSource::new(clock.clone()));

        let settings = Arc::new(SettingsService::new(Arc::new(SettingsRepository::new())));
        let fx = Arc::new(FxService::new(rates.clone(), clock.clone()));
        let goals = Arc::new(
            GoalService::new(
                Arc::new(GoalRepository::new()),
                Arc::new(FlexPreferenceRepository::new()),
                clock.clone(),
            )
            .with_event_sink(events.clone()),
        );
        let allocations = Arc::new(
            AllocationService::new(
                assets.clone(),
                transactions.clone(),
                targets,
                history.clone(),
                clock.clone(),
            )
            .with_event_sink(events.clone()),
        );
        let planning = Arc::new(PlanningService::new(
            goals.clone(),
            assets.clone(),
            transactions.clone(),
            history.clone(),
            fx.clone(),
            settings.clone(),
            clock.clone(),
        ));
        let execution = Arc::new(
            ExecutionService::new(
                executions.clone(),
                planning.clone(),
                goals.clone(),
                assets.clone(),
                transactions.clone(),
                history,
                fx,
                settings,
                clock.clone(),
            )
            .with_event_sink(events.clone()),
        );

        Self {
            clock,
            events,
            assets,
            transactions,
            rates,
            executions,
            goals,
            allocations,
            planning,
            execution,
            tx_seq: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn goal(&self, id: &str, target: Decimal, currency: &str) -> Goal {
        self.goals
            .create_goal(NewGoal {
                id: Some(id.to_string()),
                name: id.to_string(),
                target_amount: target,
                currency: currency.to_string(),
                deadline: end_of_may(),
            })
            .await
            .unwrap()
    }

    pub async fn asset(&self, id: &str, currency: &str) -> Asset {
        self.assets
            .create(Asset {
                id: id.to_string(),
                name: id.to_string(),
                kind: if currency == "BTC" {
                    AssetKind::Crypto
                } else {
                    AssetKind::Fiat
                },
                currency: currency.to_string(),
            })
            .await
            .unwrap()
    }

    /// Appends a transaction at the clock's instant and routes it.
    pub async fn deposit(&self, asset_id: &str, amount: Decimal) -> RoutingDecision {
        self.deposit_at(asset_id, amount, self.now()).await
    }

    /// Appends a transaction stamped `at` and routes it.
    pub async fn deposit_at(
        &self,
        asset_id: &str,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> RoutingDecision {
        let seq = self
            .tx_seq
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let transaction = self
            .transactions
            .append(Transaction {
                id: format!("tx-{}", seq),
                asset_id: asset_id.to_string(),
                amount,
                timestamp: at,
            })
            .unwrap();
        self.allocations
            .record_transaction(&transaction)
            .await
            .unwrap()
    }
}
