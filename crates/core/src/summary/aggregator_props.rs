//! Property-based tests for the summary aggregator.

use chrono::Utc;
use pagu_shared::types::UnitId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::context::Unit;
use crate::proposal::types::fixtures::with_status;
use crate::proposal::{Month, MonthlyAmounts, ProposalRecord};
use crate::stage::Stage;
use crate::summary::aggregator::SummaryAggregator;
use crate::workflow::ReviewStatus;

fn arb_status() -> impl Strategy<Value = ReviewStatus> {
    prop_oneof![
        Just(ReviewStatus::PendingReview),
        Just(ReviewStatus::Accepted),
        Just(ReviewStatus::Rejected),
        Just(ReviewStatus::NeedsRevision),
    ]
}

/// (total, status, blocked, planned January amount)
fn arb_records(stage: Stage) -> impl Strategy<Value = Vec<ProposalRecord>> {
    proptest::collection::vec(
        (1i64..1_000_000, arb_status(), any::<bool>(), 0i64..1_000),
        0..15,
    )
    .prop_map(move |specs| {
        specs
            .into_iter()
            .map(|(total, status, blocked, planned)| {
                let mut r = with_status("U1", stage, Decimal::from(total), status);
                r.blocked = blocked && status == ReviewStatus::Accepted;
                r.planned = MonthlyAmounts::from_pairs([(Month::Jan, Decimal::from(planned))]);
                r
            })
            .collect()
    })
}

fn unit() -> Unit {
    Unit {
        id: UnitId::parse("U1").unwrap(),
        name: "U1".into(),
        ceiling: Decimal::from(1_000_000_000),
        active: true,
    }
}

fn committed_total(records: &[ProposalRecord]) -> Decimal {
    records
        .iter()
        .filter(|r| r.status == ReviewStatus::Accepted && !r.blocked)
        .map(|r| r.total)
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: current total is the committed total of Initial plus the active revision
    #[test]
    fn prop_current_total_is_committed_sum(
        initial in arb_records(Stage::Initial),
        revision in arb_records(Stage::Revision(1)),
    ) {
        let summary = SummaryAggregator::compute(
            &unit(),
            &initial,
            Some((Stage::Revision(1), revision.as_slice())),
            Utc::now(),
        );
        prop_assert_eq!(
            summary.current_total,
            committed_total(&initial) + committed_total(&revision)
        );
        prop_assert_eq!(summary.initial_net_total, committed_total(&initial));
        prop_assert_eq!(summary.total_planned, summary.planned_monthly.total());
    }

    // Property 2: blocking an accepted record removes exactly its contribution
    #[test]
    fn prop_blocking_removes_contribution(
        initial in arb_records(Stage::Initial),
        index in any::<prop::sample::Index>(),
    ) {
        let accepted: Vec<usize> = initial
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_committed())
            .map(|(i, _)| i)
            .collect();
        prop_assume!(!accepted.is_empty());
        let target = accepted[index.index(accepted.len())];

        let now = Utc::now();
        let before = SummaryAggregator::compute(&unit(), &initial, None, now);
        let mut blocked = initial.clone();
        blocked[target].blocked = true;
        let after = SummaryAggregator::compute(&unit(), &blocked, None, now);

        prop_assert_eq!(before.current_total - after.current_total, initial[target].total);
        prop_assert_eq!(
            before.total_planned - after.total_planned,
            initial[target].planned.total()
        );
        prop_assert_eq!(blocked[target].status, ReviewStatus::Accepted);
        prop_assert_eq!(blocked[target].planned, initial[target].planned);
    }

    // Property 3: recomputing is idempotent
    #[test]
    fn prop_recompute_is_pure(initial in arb_records(Stage::Initial)) {
        let now = Utc::now();
        prop_assert_eq!(
            SummaryAggregator::compute(&unit(), &initial, None, now),
            SummaryAggregator::compute(&unit(), &initial, None, now)
        );
    }
}
