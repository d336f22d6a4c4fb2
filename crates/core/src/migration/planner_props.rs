//! Property-based tests for migration planning.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::lineage::check_unique;
use crate::migration::planner::{MigrationPlanner, MigrationScope};
use crate::proposal::types::fixtures::with_status;
use crate::stage::Stage;
use crate::workflow::ReviewStatus;

fn arb_record() -> impl Strategy<Value = (i64, ReviewStatus, bool, bool)> {
    (
        1i64..1_000_000,
        prop_oneof![
            Just(ReviewStatus::PendingReview),
            Just(ReviewStatus::Accepted),
            Just(ReviewStatus::Rejected),
            Just(ReviewStatus::NeedsRevision),
        ],
        any::<bool>(),
        any::<bool>(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: a second run over its own output copies nothing
    #[test]
    fn prop_migration_is_idempotent(
        source in proptest::collection::vec(arb_record(), 0..30),
    ) {
        let records: Vec<_> = source
            .iter()
            .map(|(total, status, blocked, second_unit)| {
                let unit = if *second_unit { "U2" } else { "U1" };
                let mut r = with_status(unit, Stage::Initial, Decimal::from(*total), *status);
                r.blocked = *blocked;
                r
            })
            .collect();
        let committed = records.iter().filter(|r| r.is_committed()).count();
        let now = Utc::now();

        let first = MigrationPlanner::plan(
            Stage::Initial, Stage::Revision(1), &records, &[], &MigrationScope::All, None, now,
        );
        prop_assert_eq!(first.copies.len(), committed);
        prop_assert!(check_unique(&first.copies).is_empty());

        let second = MigrationPlanner::plan(
            Stage::Initial, Stage::Revision(1), &records, &first.copies, &MigrationScope::All, None, now,
        );
        prop_assert!(second.is_empty());
        prop_assert_eq!(second.skipped_already_migrated, committed);
    }

    // Property 2: copies preserve money and point back at their source
    #[test]
    fn prop_copies_preserve_totals(
        source in proptest::collection::vec(arb_record(), 0..30),
    ) {
        let records: Vec<_> = source
            .iter()
            .map(|(total, status, blocked, _)| {
                let mut r = with_status("U1", Stage::Initial, Decimal::from(*total), *status);
                r.blocked = *blocked;
                r
            })
            .collect();
        let plan = MigrationPlanner::plan(
            Stage::Initial, Stage::Revision(1), &records, &[], &MigrationScope::All, None, Utc::now(),
        );

        let committed_total: Decimal = records.iter().filter(|r| r.is_committed()).map(|r| r.total).sum();
        let copied_total: Decimal = plan.copies.iter().map(|c| c.total).sum();
        prop_assert_eq!(committed_total, copied_total);
        for copy in &plan.copies {
            let origin = records.iter().find(|r| Some(r.id) == copy.lineage_id);
            prop_assert!(origin.is_some_and(|o| o.total == copy.total && o.is_committed()));
            prop_assert_eq!(copy.status, ReviewStatus::PendingReview);
        }
    }
}
