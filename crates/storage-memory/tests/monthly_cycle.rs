mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{may, Harness};
use goalpace_core::allocations::{AllocationServiceTrait, RoutingDecision};
use goalpace_core::contributions::RateBasisKind;
use goalpace_core::errors::Error;
use goalpace_core::events::DomainEvent;
use goalpace_core::execution::{
    ExecutionError, ExecutionRepositoryTrait, ExecutionServiceTrait, ExecutionStatus,
};
use goalpace_core::planning::PlanningServiceTrait;
use goalpace_core::requirements::RequirementStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn emergency_fund_month_from_plan_to_completion() {
    let h = Harness::new();
    h.goal("emergency-fund", dec!(600), "USD").await;
    h.asset("savings", "USD").await;
    h.allocations
        .set_allocation_target("savings", "emergency-fund", Decimal::ZERO)
        .await
        .unwrap();

    let requirements = h.planning.compute_requirements().await.unwrap();
    let requirement = &requirements.requirements[0];
    assert_eq!(requirement.months_remaining, 1);
    assert_eq!(requirement.required_monthly, dec!(600));

    let record = h.execution.start_executing(may()).await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Executing);
    let snapshot = h.executions.get_snapshot(&record.id).unwrap().unwrap();
    assert_eq!(snapshot.goal("emergency-fund").unwrap().planned_amount, dec!(600));

    h.clock.advance(Duration::hours(3));
    let decision = h.deposit("savings", dec!(600)).await;
    match decision {
        RoutingDecision::Dedicated { goal_id, entry } => {
            assert_eq!(goal_id, "emergency-fund");
            assert_eq!(entry.amount, dec!(600));
        }
        other => panic!("expected dedicated routing, got {:?}", other),
    }

    let progress = h.execution.get_progress(may()).await.unwrap();
    let goal = progress.progress_for("emergency-fund").unwrap();
    assert_eq!(goal.derived_total, dec!(600));
    assert!(goal.fulfilled);
    assert_eq!(progress.basis, RateBasisKind::Live { stale: false });

    h.clock.advance(Duration::days(20));
    let closed = h.execution.complete(may()).await.unwrap();
    assert_eq!(closed.status, ExecutionStatus::Closed);

    let completed = h.execution.get_completed(may()).unwrap().unwrap();
    let goal = completed.goal("emergency-fund").unwrap();
    assert_eq!(goal.planned_amount, dec!(600));
    assert_eq!(goal.actual_amount, dec!(600));
    assert_eq!(goal.percent_complete, dec!(100));
    assert!(goal.fulfilled);

    // the goal is funded now, so the live plan asks for nothing more
    let after = h.planning.compute_requirements().await.unwrap();
    assert_eq!(after.requirements[0].required_monthly, Decimal::ZERO);
    assert_eq!(after.requirements[0].status, RequirementStatus::Completed);
}

#[tokio::test]
async fn start_twice_and_undo_window() {
    let h = Harness::new();
    h.goal("trip", dec!(900), "USD").await;

    h.execution.start_executing(may()).await.unwrap();
    let err = h.execution.start_executing(may()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Execution(ExecutionError::InvalidTransition { .. })
    ));
    assert_eq!(err.user_message(), "This month is already being tracked");

    h.clock.advance(Duration::days(1));
    let closed = h.execution.complete(may()).await.unwrap();
    assert!(h.execution.get_completed(may()).unwrap().is_some());

    h.clock.advance(Duration::hours(23));
    let reopened = h.execution.undo(may()).await.unwrap();
    assert_eq!(reopened.id, closed.id);
    assert_eq!(reopened.status, ExecutionStatus::Executing);
    assert!(h.execution.get_completed(may()).unwrap().is_none());
    assert!(h.executions.get_snapshot(&reopened.id).unwrap().is_some());

    h.execution.complete(may()).await.unwrap();
    h.clock.advance(Duration::hours(24));
    let err = h.execution.undo(may()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Execution(ExecutionError::GracePeriodExpired { .. })
    ));
    assert!(h.execution.get_completed(may()).unwrap().is_some());
}

#[tokio::test]
async fn closed_month_keeps_frozen_rates() {
    let h = Harness::new();
    h.goal("house", dec!(120000), "USD").await;
    h.asset("btc", "BTC").await;
    h.rates.set_rate("BTC", "USD", dec!(60000)).unwrap();
    h.allocations
        .set_allocation_target("btc", "house", Decimal::ZERO)
        .await
        .unwrap();

    h.execution.start_executing(may()).await.unwrap();
    h.clock.advance(Duration::hours(1));
    h.deposit("btc", dec!(0.5)).await;

    let live = h.execution.get_progress(may()).await.unwrap();
    assert_eq!(live.progress_for("house").unwrap().derived_total, dec!(30000));

    h.clock.advance(Duration::days(1));
    h.execution.complete(may()).await.unwrap();
    let completed = h.execution.get_completed(may()).unwrap().unwrap();
    assert_eq!(completed.exchange_rates.rates.get("BTC/USD"), Some(&dec!(60000)));

    // later rate moves do not touch the closed month
    h.rates.set_rate("BTC", "USD", dec!(90000)).unwrap();
    let frozen = h.execution.get_progress(may()).await.unwrap();
    assert_eq!(frozen.basis, RateBasisKind::Frozen);
    assert_eq!(frozen.progress_for("house").unwrap().derived_total, dec!(30000));
}

#[tokio::test]
async fn closed_month_progress_ignores_facts_recorded_after_close() {
    let h = Harness::new();
    h.goal("emergency-fund", dec!(600), "USD").await;
    h.asset("savings", "USD").await;
    h.allocations
        .set_allocation_target("savings", "emergency-fund", Decimal::ZERO)
        .await
        .unwrap();

    let record = h.execution.start_executing(may()).await.unwrap();
    let started_at = record.started_at.unwrap();
    h.clock.advance(Duration::hours(1));
    h.deposit("savings", dec!(100)).await;
    h.clock.advance(Duration::days(2));
    h.execution.complete(may()).await.unwrap();

    // a late import stamped inside the closed window
    h.deposit_at("savings", dec!(400), started_at + Duration::hours(5))
        .await;

    let completed = h.execution.get_completed(may()).unwrap().unwrap();
    let frozen = completed.goal("emergency-fund").unwrap();
    assert_eq!(frozen.actual_amount, dec!(100));

    let progress = h.execution.get_progress(may()).await.unwrap();
    assert_eq!(progress.basis, RateBasisKind::Frozen);
    let goal = progress.progress_for("emergency-fund").unwrap();
    assert_eq!(goal.derived_total, frozen.actual_amount);
    assert_eq!(goal.fulfilled, frozen.fulfilled);
    assert!(!goal.fulfilled);
    assert_eq!(progress.events, completed.contributions);
    assert_eq!(progress.shortfalls, completed.shortfalls);
    assert_eq!(progress.window.end, completed.completed_at);
}

#[tokio::test]
async fn rate_outage_marks_progress_stale() {
    let h = Harness::new();
    h.goal("house", dec!(120000), "USD").await;
    h.asset("btc", "BTC").await;
    h.rates.set_rate("BTC", "USD", dec!(60000)).unwrap();
    h.allocations
        .set_allocation_target("btc", "house", Decimal::ZERO)
        .await
        .unwrap();
    h.execution.start_executing(may()).await.unwrap();
    h.clock.advance(Duration::hours(1));
    h.deposit("btc", dec!(0.1)).await;

    h.rates.set_offline(true);
    let progress = h.execution.get_progress(may()).await.unwrap();
    assert_eq!(progress.basis, RateBasisKind::Live { stale: true });
    assert_eq!(progress.progress_for("house").unwrap().derived_total, dec!(6000));
}

#[tokio::test]
async fn over_allocated_asset_splits_proportionally() {
    let h = Harness::new();
    h.goal("car", dec!(2), "BTC").await;
    h.goal("boat", dec!(2), "BTC").await;
    h.asset("btc", "BTC").await;
    h.allocations
        .set_allocation_target("btc", "car", dec!(0.6))
        .await
        .unwrap();
    h.allocations
        .set_allocation_target("btc", "boat", dec!(0.6))
        .await
        .unwrap();

    h.execution.start_executing(may()).await.unwrap();
    h.clock.advance(Duration::hours(1));
    let decision = h.deposit("btc", dec!(1.0)).await;
    assert!(matches!(decision, RoutingDecision::Shared));

    let split = h.allocations.split_at("btc", h.now()).unwrap();
    assert_eq!(split.effective_for("car"), dec!(0.5));
    assert_eq!(split.effective_for("boat"), dec!(0.5));
    assert_eq!(split.shortfall, dec!(0.2));

    let progress = h.execution.get_progress(may()).await.unwrap();
    assert_eq!(progress.progress_for("car").unwrap().derived_total, dec!(0.5));
    assert_eq!(progress.progress_for("boat").unwrap().derived_total, dec!(0.5));
    assert_eq!(progress.shortfalls.len(), 1);
    assert_eq!(progress.shortfalls[0].shortfall, dec!(0.2));
}

#[tokio::test]
async fn history_lists_closed_months_newest_first() {
    let h = Harness::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
    h.goal("trip", dec!(900), "USD").await;

    for month in ["2024-03", "2024-04", "2024-05"] {
        let month = month.parse().unwrap();
        h.execution.start_executing(month).await.unwrap();
        h.clock.advance(Duration::days(25));
        h.execution.complete(month).await.unwrap();
        h.clock.advance(Duration::days(6));
    }

    let months: Vec<String> = h
        .execution
        .get_history(Some(2), 0)
        .unwrap()
        .iter()
        .map(|c| c.month_label.to_string())
        .collect();
    assert_eq!(months, vec!["2024-05", "2024-04"]);
    assert_eq!(h.execution.get_history(None, 2).unwrap().len(), 1);
}

#[tokio::test]
async fn lifecycle_and_edits_emit_domain_events() {
    let h = Harness::new();
    h.goal("trip", dec!(900), "USD").await;
    h.execution.start_executing(may()).await.unwrap();

    let events = h.events.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::GoalsChanged { .. })));
    assert!(events.iter().any(|e| *e
        == DomainEvent::execution_transitioned(
            may(),
            ExecutionStatus::Draft,
            ExecutionStatus::Executing
        )));
}
