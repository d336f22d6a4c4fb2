//! Property-based tests for the ceiling guard.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::ceiling::guard::CeilingGuard;
use crate::proposal::types::fixtures::with_status;
use crate::stage::Stage;
use crate::workflow::ReviewStatus;

fn arb_status() -> impl Strategy<Value = ReviewStatus> {
    prop_oneof![
        Just(ReviewStatus::PendingReview),
        Just(ReviewStatus::Accepted),
        Just(ReviewStatus::Rejected),
        Just(ReviewStatus::NeedsRevision),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: a submission A is allowed iff T + A <= C
    #[test]
    fn prop_allowed_iff_within_ceiling(
        existing in proptest::collection::vec((1i64..1_000_000, arb_status()), 0..20),
        ceiling in 0i64..20_000_000,
        prospective in 1i64..5_000_000,
    ) {
        let records: Vec<_> = existing
            .iter()
            .map(|(total, status)| with_status("U1", Stage::Initial, Decimal::from(*total), *status))
            .collect();
        let active: i64 = existing
            .iter()
            .filter(|(_, status)| *status != ReviewStatus::Rejected)
            .map(|(total, _)| *total)
            .sum();

        let check = CeilingGuard::check(
            Decimal::from(ceiling),
            &records,
            None,
            Decimal::from(prospective),
        )
        .unwrap();
        prop_assert_eq!(check.projected_total, Decimal::from(active + prospective));
        prop_assert_eq!(check.allowed, active + prospective <= ceiling);
        prop_assert_eq!(check.into_result().is_ok(), check.allowed);
    }
}
