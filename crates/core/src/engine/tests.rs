//! End-to-end engine tests on the in-memory store.

use pagu_shared::config::CycleConfig;
use pagu_shared::types::{PageRequest, ProposalId, UnitId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use super::{BudgetEngine, SettingsUpdate};
use crate::context::Unit;
use crate::error::CoreError;
use crate::migration::MigrationRequest;
use crate::proposal::{Month, MonthlyAmounts, ProposalDraft};
use crate::recap::RecapFilter;
use crate::stage::Stage;
use crate::store::{InMemoryStore, ProposalStore, RecordFilter};
use crate::variance::ChangeKind;
use crate::workflow::{Actor, HistoryAction, ReviewStatus};

fn u1() -> UnitId {
    UnitId::parse("U1").unwrap()
}

fn draft(activity: &str, quantity: Decimal, unit_price: Decimal) -> ProposalDraft {
    ProposalDraft {
        category: "Goods".to_string(),
        subcategory: Some("Office".to_string()),
        activity: activity.to_string(),
        unit_label: "package".to_string(),
        quantity,
        unit_price,
        planned: None,
    }
}

struct Fixture {
    engine: BudgetEngine,
    owner: Actor,
    reviewer: Actor,
    admin: Actor,
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::with_units([
        Unit {
            id: u1(),
            name: "Informatics".to_string(),
            ceiling: dec!(1000000),
            active: true,
        },
        Unit {
            id: UnitId::parse("U2").unwrap(),
            name: "Library".to_string(),
            ceiling: dec!(200000),
            active: true,
        },
    ]);
    let engine = BudgetEngine::load(Arc::new(store), &CycleConfig::default())
        .await
        .unwrap();
    Fixture {
        engine,
        owner: Actor::unit(UserId::new(), u1()),
        reviewer: Actor::reviewer(UserId::new()),
        admin: Actor::administrator(UserId::new()),
    }
}

impl Fixture {
    async fn submit(&self, activity: &str, quantity: Decimal, price: Decimal) -> ProposalId {
        self.engine
            .create_proposal(&self.owner, Stage::Initial, None, draft(activity, quantity, price))
            .await
            .unwrap()
            .id
    }

    async fn accept(&self, stage: Stage, id: ProposalId) {
        self.engine
            .review(&self.reviewer, stage, id, ReviewStatus::Accepted, None)
            .await
            .unwrap();
    }

    async fn open_revision(&self, n: u8) {
        self.engine
            .update_settings(
                &self.admin,
                SettingsUpdate {
                    active_revision: Some(n),
                    revision_open: Some(true),
                    initial_open: None,
                },
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_submission_is_capped_by_ceiling() {
    let f = fixture().await;
    let a = f
        .engine
        .create_proposal(&f.owner, Stage::Initial, None, draft("A", dec!(10), dec!(50000)))
        .await
        .unwrap();
    assert_eq!(a.total, dec!(500000));

    let err = f
        .engine
        .create_proposal(&f.owner, Stage::Initial, None, draft("B", dec!(20), dec!(30000)))
        .await
        .unwrap_err();
    match err {
        CoreError::Ceiling(crate::ceiling::CeilingError::Exceeded { projected, ceiling }) => {
            assert_eq!(projected, dec!(1100000));
            assert_eq!(ceiling, dec!(1000000));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let records = f
        .engine
        .list_proposals(&f.owner, Stage::Initial, RecordFilter::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_cannot_jointly_exceed_ceiling() {
    let f = fixture().await;
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let engine = f.engine.clone();
            let owner = f.owner.clone();
            tokio::spawn(async move {
                engine
                    .create_proposal(
                        &owner,
                        Stage::Initial,
                        None,
                        draft(&format!("item {i}"), dec!(3), dec!(100000)),
                    )
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 3);

    let records = f
        .engine
        .list_proposals(&f.owner, Stage::Initial, RecordFilter::default())
        .await
        .unwrap();
    let total: Decimal = records.iter().map(|r| r.total).sum();
    assert_eq!(total, dec!(900000));
}

#[tokio::test]
async fn test_accept_then_plan_updates_summary() {
    let f = fixture().await;
    let a = f.submit("A", dec!(10), dec!(50000)).await;
    f.accept(Stage::Initial, a).await;

    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.current_total, dec!(500000));
    assert_eq!(summary.total_planned, Decimal::ZERO);

    let plan = MonthlyAmounts::from_pairs([(Month::Jan, dec!(50000)), (Month::Feb, dec!(450000))]);
    f.engine
        .save_monthly_plan(&f.owner, Stage::Initial, a, plan)
        .await
        .unwrap();

    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.total_planned, dec!(500000));
    assert_eq!(summary.planned_monthly[Month::Jan], dec!(50000));
    assert_eq!(summary.planned_monthly[Month::Feb], dec!(450000));
    assert_eq!(summary.planned_monthly[Month::Mar], Decimal::ZERO);
}

#[tokio::test]
async fn test_accepted_plan_must_match_total() {
    let f = fixture().await;
    let a = f.submit("A", dec!(10), dec!(50000)).await;
    f.accept(Stage::Initial, a).await;

    let partial = MonthlyAmounts::from_pairs([(Month::Jan, dec!(100))]);
    let err = f
        .engine
        .save_monthly_plan(&f.owner, Stage::Initial, a, partial)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PLAN_MISMATCH");
}

#[tokio::test]
async fn test_migration_and_matrix() {
    let f = fixture().await;
    let a = f.submit("A", dec!(10), dec!(50000)).await;
    f.accept(Stage::Initial, a).await;
    f.open_revision(1).await;

    let report = f.engine.migrate_active(&f.admin, None).await.unwrap();
    assert_eq!(report.inserted, 1);
    let copy_id = report.inserted_ids[0];
    let copy = f
        .engine
        .get_proposal(&f.owner, Stage::Revision(1), copy_id)
        .await
        .unwrap();
    assert_eq!(copy.lineage_id, Some(a));
    assert_eq!(copy.status, ReviewStatus::PendingReview);

    let again = f.engine.migrate_active(&f.admin, None).await.unwrap();
    assert_eq!(again.inserted, 0);

    f.engine
        .update_proposal(&f.owner, Stage::Revision(1), copy_id, draft("A", dec!(14), dec!(50000)))
        .await
        .unwrap();
    f.accept(Stage::Revision(1), copy_id).await;

    let matrix = f
        .engine
        .matrix(&f.reviewer, Stage::Revision(1), None)
        .await
        .unwrap();
    let row = &matrix.units[0].rows[0];
    assert_eq!(matrix.units[0].unit_name, "Informatics");
    assert_eq!(row.change, ChangeKind::Changed);
    assert_eq!(row.totals.before, dec!(500000));
    assert_eq!(row.totals.after, dec!(700000));
    assert_eq!(row.totals.delta, dec!(200000));
}

#[tokio::test]
async fn test_budget_cycle_from_submission_to_matrix() {
    let f = fixture().await;

    // Ceiling 1,000,000: A fits, B would reach 1,100,000.
    let a = f.submit("A", dec!(10), dec!(50000)).await;
    let err = f
        .engine
        .create_proposal(&f.owner, Stage::Initial, None, draft("B", dec!(20), dec!(30000)))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CEILING_EXCEEDED");

    f.accept(Stage::Initial, a).await;
    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.current_total, dec!(500000));
    assert_eq!(summary.total_planned, Decimal::ZERO);

    let plan = MonthlyAmounts::from_pairs([(Month::Jan, dec!(50000)), (Month::Feb, dec!(450000))]);
    f.engine
        .save_monthly_plan(&f.owner, Stage::Initial, a, plan)
        .await
        .unwrap();
    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.total_planned, dec!(500000));
    assert_eq!(summary.planned_monthly, plan);

    f.open_revision(1).await;
    let report = f.engine.migrate_active(&f.admin, None).await.unwrap();
    assert_eq!(report.inserted, 1);
    let copy_id = report.inserted_ids[0];
    let copy = f
        .engine
        .get_proposal(&f.owner, Stage::Revision(1), copy_id)
        .await
        .unwrap();
    assert_eq!(copy.lineage_id, Some(a));
    assert_eq!(copy.status, ReviewStatus::PendingReview);
    assert_eq!(copy.planned, plan);
    assert_eq!(f.engine.migrate_active(&f.admin, None).await.unwrap().inserted, 0);

    // The copy keeps its 500,000 plan while its total grows to 700,000.
    let edited = f
        .engine
        .update_proposal(&f.owner, Stage::Revision(1), copy_id, draft("A", dec!(14), dec!(50000)))
        .await
        .unwrap();
    assert_eq!(edited.total, dec!(700000));
    assert_eq!(edited.planned, plan);
    let accepted = f
        .engine
        .review(&f.reviewer, Stage::Revision(1), copy_id, ReviewStatus::Accepted, None)
        .await
        .unwrap();
    assert_eq!(accepted.status, ReviewStatus::Accepted);

    let matrix = f
        .engine
        .matrix(&f.reviewer, Stage::Revision(1), None)
        .await
        .unwrap();
    let row = &matrix.units[0].rows[0];
    assert_eq!(row.change, ChangeKind::Changed);
    assert_eq!(row.totals.before, dec!(500000));
    assert_eq!(row.totals.after, dec!(700000));
    assert_eq!(row.totals.delta, dec!(200000));
    assert_eq!(matrix.units[0].subtotal.delta, dec!(200000));

    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.current_total, dec!(1200000));
}

#[tokio::test]
async fn test_matrix_with_blocked_predecessor_counts_as_new() {
    let f = fixture().await;
    let a = f.submit("A", dec!(1), dec!(300)).await;
    f.accept(Stage::Initial, a).await;
    f.open_revision(1).await;
    let copy_id = f.engine.migrate_active(&f.admin, None).await.unwrap().inserted_ids[0];
    f.accept(Stage::Revision(1), copy_id).await;
    f.engine
        .set_blocked(&f.reviewer, Stage::Initial, a, true)
        .await
        .unwrap();

    let matrix = f
        .engine
        .matrix(&f.reviewer, Stage::Revision(1), None)
        .await
        .unwrap();
    let row = &matrix.units[0].rows[0];
    assert_eq!(row.change, ChangeKind::New);
    assert_eq!(row.totals.before, Decimal::ZERO);
    assert_eq!(row.totals.after, dec!(300));
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected() {
    let f = fixture().await;
    let a = f.submit("A", dec!(10), dec!(50000)).await;

    let err = f
        .engine
        .check_ceiling(&f.owner, &u1(), Decimal::MAX)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
    assert_eq!(err.status_code(), 400);

    let mut huge_plan = draft("B", dec!(1), dec!(10));
    huge_plan.planned = Some(MonthlyAmounts::from_pairs([
        (Month::Jan, Decimal::MAX),
        (Month::Feb, Decimal::MAX),
    ]));
    let err = f
        .engine
        .create_proposal(&f.owner, Stage::Initial, None, huge_plan)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "MONTHLY_OUT_OF_RANGE");

    f.accept(Stage::Initial, a).await;
    let huge = MonthlyAmounts::from_pairs([(Month::Mar, Decimal::MAX), (Month::Apr, Decimal::MAX)]);
    let err = f
        .engine
        .save_monthly_execution(&f.owner, Stage::Initial, a, huge)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "MONTHLY_OUT_OF_RANGE");
    let err = f
        .engine
        .save_monthly_plan(&f.owner, Stage::Initial, a, huge)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "MONTHLY_OUT_OF_RANGE");

    let err = f
        .engine
        .set_ceiling(&f.admin, &u1(), Decimal::MAX)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reset_and_edit_respect_ceiling() {
    for _ in 0..20 {
        let f = fixture().await;
        let rejected = f.submit("R", dec!(1), dec!(600000)).await;
        f.engine
            .review(&f.reviewer, Stage::Initial, rejected, ReviewStatus::Rejected, None)
            .await
            .unwrap();
        let active = f.submit("A", dec!(1), dec!(400000)).await;

        let engine = f.engine.clone();
        let reviewer = f.reviewer.clone();
        let reset = tokio::spawn(async move {
            engine.reset_status(&reviewer, Stage::Initial, rejected).await
        });
        let engine = f.engine.clone();
        let owner = f.owner.clone();
        let edit = tokio::spawn(async move {
            engine
                .update_proposal(&owner, Stage::Initial, active, draft("A", dec!(1), dec!(500000)))
                .await
        });
        let reset_ok = reset.await.unwrap().is_ok();
        let edit_ok = edit.await.unwrap().is_ok();
        assert!(reset_ok != edit_ok, "exactly one write fits under the ceiling");

        let records = f
            .engine
            .list_proposals(&f.reviewer, Stage::Initial, RecordFilter::default())
            .await
            .unwrap();
        let active_total: Decimal = records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.total)
            .sum();
        assert!(active_total <= dec!(1000000));
    }
}

#[tokio::test]
async fn test_superseded_record_is_read_only() {
    let f = fixture().await;
    let a = f.submit("A", dec!(1), dec!(100)).await;
    f.accept(Stage::Initial, a).await;
    f.open_revision(1).await;
    f.engine
        .migrate(
            &f.admin,
            &MigrationRequest {
                destination: Stage::Revision(1),
                source: None,
                unit_id: None,
            },
        )
        .await
        .unwrap();

    let err = f
        .engine
        .update_proposal(&f.reviewer, Stage::Initial, a, draft("A", dec!(2), dec!(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Superseded { successor: Stage::Revision(1), .. }));
    assert!(
        f.engine
            .delete_proposal(&f.reviewer, Stage::Initial, a)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_blocking_removes_contribution_without_changing_status() {
    let f = fixture().await;
    let a = f.submit("A", dec!(10), dec!(50000)).await;
    f.accept(Stage::Initial, a).await;

    let blocked = f
        .engine
        .set_blocked(&f.reviewer, Stage::Initial, a, true)
        .await
        .unwrap();
    assert_eq!(blocked.status, ReviewStatus::Accepted);
    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.current_total, Decimal::ZERO);

    // blocked records no longer count against the ceiling
    f.engine
        .create_proposal(&f.owner, Stage::Initial, None, draft("B", dec!(1), dec!(900000)))
        .await
        .unwrap();

    f.engine
        .set_blocked(&f.reviewer, Stage::Initial, a, false)
        .await
        .unwrap();
    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.current_total, dec!(500000));
}

#[tokio::test]
async fn test_owner_permissions() {
    let f = fixture().await;
    let a = f.submit("A", dec!(1), dec!(100)).await;
    let stranger = Actor::unit(UserId::new(), UnitId::parse("U2").unwrap());

    let err = f
        .engine
        .get_proposal(&stranger, Stage::Initial, a)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let err = f
        .engine
        .review(&f.owner, Stage::Initial, a, ReviewStatus::Accepted, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_PERMITTED");

    f.accept(Stage::Initial, a).await;
    let err = f
        .engine
        .update_proposal(&f.owner, Stage::Initial, a, draft("A", dec!(2), dec!(100)))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let listed = f
        .engine
        .list_proposals(&stranger, Stage::Initial, RecordFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_closed_and_inactive_stages() {
    let f = fixture().await;
    let err = f
        .engine
        .create_proposal(&f.owner, Stage::Revision(1), None, draft("A", dec!(1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StageNotActive(Stage::Revision(1))));

    f.engine
        .update_settings(
            &f.admin,
            SettingsUpdate {
                initial_open: Some(false),
                ..SettingsUpdate::default()
            },
        )
        .await
        .unwrap();
    let err = f
        .engine
        .create_proposal(&f.owner, Stage::Initial, None, draft("A", dec!(1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StageClosed(Stage::Initial)));

    f.engine
        .create_proposal(&f.reviewer, Stage::Initial, Some(u1()), draft("A", dec!(1), dec!(1)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reset_rejected_rechecks_ceiling() {
    let f = fixture().await;
    let a = f.submit("A", dec!(1), dec!(600000)).await;
    f.engine
        .review(&f.reviewer, Stage::Initial, a, ReviewStatus::Rejected, Some("too much".into()))
        .await
        .unwrap();
    f.submit("B", dec!(1), dec!(600000)).await;

    let err = f
        .engine
        .reset_status(&f.reviewer, Stage::Initial, a)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CEILING_EXCEEDED");
}

#[tokio::test]
async fn test_history_and_delete() {
    let f = fixture().await;
    let a = f.submit("A", dec!(1), dec!(100)).await;
    f.engine
        .review(&f.reviewer, Stage::Initial, a, ReviewStatus::NeedsRevision, Some("split".into()))
        .await
        .unwrap();

    let history = f
        .engine
        .history(&f.owner, Stage::Initial, a, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.meta.total, 2);
    assert_eq!(history.data[0].action, HistoryAction::Reviewed);
    assert_eq!(history.data[1].action, HistoryAction::Created);

    f.engine
        .delete_proposal(&f.owner, Stage::Initial, a)
        .await
        .unwrap();
    let err = f
        .engine
        .get_proposal(&f.owner, Stage::Initial, a)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProposalNotFound { .. }));
    let summary = f.engine.summary(&f.owner, &u1()).await.unwrap();
    assert_eq!(summary.total_submitted, Decimal::ZERO);
}

#[tokio::test]
async fn test_execution_and_recap() {
    let f = fixture().await;
    let a = f.submit("A", dec!(1), dec!(1000)).await;

    let early = f
        .engine
        .save_monthly_execution(
            &f.owner,
            Stage::Initial,
            a,
            MonthlyAmounts::from_pairs([(Month::Jan, dec!(1))]),
        )
        .await
        .unwrap_err();
    assert_eq!(early.error_code(), "EXECUTION_REQUIRES_COMMITTED");

    f.engine
        .save_monthly_plan(
            &f.owner,
            Stage::Initial,
            a,
            MonthlyAmounts::from_pairs([(Month::Mar, dec!(1000))]),
        )
        .await
        .unwrap();
    f.accept(Stage::Initial, a).await;
    f.engine
        .save_monthly_execution(
            &f.owner,
            Stage::Initial,
            a,
            MonthlyAmounts::from_pairs([(Month::Mar, dec!(250))]),
        )
        .await
        .unwrap();

    let rows = f
        .engine
        .recap(&f.owner, Stage::Initial, RecapFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_accepted, dec!(1000));
    assert_eq!(rows[0].execution_rate, dec!(25));
}

#[tokio::test]
async fn test_admin_operations() {
    let f = fixture().await;
    let err = f
        .engine
        .set_ceiling(&f.reviewer, &u1(), dec!(5))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let unit = f
        .engine
        .set_ceiling(&f.admin, &u1(), dec!(2000000))
        .await
        .unwrap();
    assert_eq!(unit.ceiling, dec!(2000000));
    let check = f
        .engine
        .check_ceiling(&f.owner, &u1(), dec!(1500000))
        .await
        .unwrap();
    assert!(check.allowed);

    let err = f
        .engine
        .update_settings(
            &f.admin,
            SettingsUpdate {
                active_revision: Some(31),
                ..SettingsUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "STAGE_OUT_OF_RANGE");

    let dashboard = f.engine.dashboard(&f.reviewer).await.unwrap();
    assert_eq!(dashboard.portfolio.units, dashboard.units.len());
    let all = f.engine.recompute_all(&f.admin).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(
        f.engine
            .store()
            .get_summary(&UnitId::parse("U2").unwrap())
            .await
            .unwrap()
            .is_some()
    );
}
