//! Property-based tests for the variance comparator.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::proposal::types::fixtures::with_status;
use crate::stage::Stage;
use crate::variance::comparator::VarianceComparator;
use crate::variance::types::MatrixTotals;
use crate::workflow::ReviewStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: linked rows have delta = after - before and subtotals sum their rows
    #[test]
    fn prop_delta_and_subtotals(
        pairs in proptest::collection::vec((1i64..10_000_000, 1i64..10_000_000, any::<bool>()), 1..25),
    ) {
        let mut previous = Vec::new();
        let mut current = Vec::new();
        for (i, (before, after, second_unit)) in pairs.iter().enumerate() {
            let unit = if *second_unit { "U2" } else { "U1" };
            let old = with_status(unit, Stage::Initial, Decimal::from(*before), ReviewStatus::Accepted);
            let mut new = old.carry_forward(Stage::Revision(1), None, Utc::now());
            new.total = Decimal::from(*after);
            new.status = ReviewStatus::Accepted;
            new.classification.activity = format!("item {i:03}");
            previous.push(old);
            current.push(new);
        }

        let report = VarianceComparator::compare(
            Stage::Initial, Stage::Revision(1), &previous, &current, &HashMap::new(), Utc::now(),
        );
        prop_assert_eq!(report.row_count(), pairs.len());
        for unit in &report.units {
            for row in &unit.rows {
                prop_assert_eq!(row.totals.delta, row.totals.after - row.totals.before);
                prop_assert!(row.predecessor_id.is_some());
            }
            let summed: MatrixTotals = unit.rows.iter().map(|r| &r.totals).sum();
            prop_assert_eq!(summed, unit.subtotal);
        }
        let expected: i64 = pairs.iter().map(|(b, a, _)| a - b).sum();
        prop_assert_eq!(report.grand_total.delta, Decimal::from(expected));
    }

    // Property 2: blocking a current record removes exactly its row
    #[test]
    fn prop_blocking_removes_row(
        totals in proptest::collection::vec(1i64..1_000_000, 1..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut current: Vec<_> = totals
            .iter()
            .map(|t| with_status("U1", Stage::Revision(1), Decimal::from(*t), ReviewStatus::Accepted))
            .collect();
        let before = VarianceComparator::compare(
            Stage::Initial, Stage::Revision(1), &[], &current, &HashMap::new(), Utc::now(),
        );
        let i = pick.index(current.len());
        current[i].blocked = true;
        let after = VarianceComparator::compare(
            Stage::Initial, Stage::Revision(1), &[], &current, &HashMap::new(), Utc::now(),
        );

        prop_assert_eq!(after.row_count() + 1, before.row_count());
        prop_assert_eq!(after.grand_total.after + current[i].total, before.grand_total.after);
        prop_assert_eq!(current[i].status, ReviewStatus::Accepted);
    }
}
