//! Builds the matrix from two stages' records.

use chrono::{DateTime, Utc};
use pagu_shared::types::UnitId;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::lineage::{Lineage, LineageIndex};
use crate::proposal::ProposalRecord;
use crate::stage::Stage;
use crate::variance::types::{ChangeKind, MatrixReport, MatrixRow, MatrixTotals, UnitMatrix};

/// Stateless matrix builder.
pub struct VarianceComparator;

impl VarianceComparator {
    /// One row for a current-stage record.
    ///
    /// Linked records compare against their predecessor's total. Unlinked
    /// records, records whose predecessor is not committed and dangling
    /// pointers are New with `before = 0`.
    #[must_use]
    pub fn row(record: &ProposalRecord, index: &LineageIndex<'_>) -> MatrixRow {
        let (predecessor_id, totals, change) = match index.resolve(record) {
            Lineage::Linked(previous) => {
                let totals = MatrixTotals::new(previous.total, record.total);
                (Some(previous.id), totals, ChangeKind::from_delta(totals.delta))
            }
            Lineage::Unlinked | Lineage::Uncommitted(_) | Lineage::Dangling(_) => (
                None,
                MatrixTotals::new(Decimal::ZERO, record.total),
                ChangeKind::New,
            ),
        };
        MatrixRow {
            record_id: record.id,
            predecessor_id,
            item_name: record.item_name().to_string(),
            category: record.classification.category.clone(),
            subcategory: record.classification.subcategory.clone(),
            totals,
            change,
        }
    }

    /// Compares the committed records of `current` against those of `previous`.
    ///
    /// `previous_records` should hold every record of the previous stage so
    /// that pointers to uncommitted predecessors are not reported as
    /// dangling. Uncommitted records contribute nothing on either side.
    /// Previous-stage items without a successor do not appear.
    #[must_use]
    pub fn compare(
        previous: Stage,
        current: Stage,
        previous_records: &[ProposalRecord],
        current_records: &[ProposalRecord],
        unit_names: &HashMap<UnitId, String>,
        now: DateTime<Utc>,
    ) -> MatrixReport {
        let index = LineageIndex::new(previous_records);

        let mut by_unit: BTreeMap<&UnitId, Vec<MatrixRow>> = BTreeMap::new();
        for record in current_records.iter().filter(|r| r.is_committed()) {
            by_unit
                .entry(&record.unit_id)
                .or_default()
                .push(Self::row(record, &index));
        }

        let units: Vec<UnitMatrix> = by_unit
            .into_iter()
            .map(|(unit_id, mut rows)| {
                rows.sort_by(|a, b| {
                    a.item_name
                        .cmp(&b.item_name)
                        .then_with(|| a.record_id.cmp(&b.record_id))
                });
                let subtotal = rows.iter().map(|r| &r.totals).sum();
                UnitMatrix {
                    unit_id: unit_id.clone(),
                    unit_name: unit_names
                        .get(unit_id)
                        .cloned()
                        .unwrap_or_else(|| unit_id.to_string()),
                    rows,
                    subtotal,
                }
            })
            .collect();
        let grand_total = units.iter().map(|u| &u.subtotal).sum();

        MatrixReport {
            previous,
            current,
            units,
            grand_total,
            generated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::types::fixtures::with_status;
    use crate::workflow::ReviewStatus;
    use pagu_shared::types::ProposalId;
    use rust_decimal_macros::dec;

    fn accepted(unit: &str, stage: Stage, total: Decimal) -> ProposalRecord {
        with_status(unit, stage, total, ReviewStatus::Accepted)
    }

    fn successor(previous: &ProposalRecord, total: Decimal) -> ProposalRecord {
        let mut next = previous.carry_forward(Stage::Revision(1), None, Utc::now());
        next.total = total;
        next.status = ReviewStatus::Accepted;
        next
    }

    fn compare(previous: &[ProposalRecord], current: &[ProposalRecord]) -> MatrixReport {
        VarianceComparator::compare(
            Stage::Initial,
            Stage::Revision(1),
            previous,
            current,
            &HashMap::new(),
            Utc::now(),
        )
    }

    #[test]
    fn test_changed_item() {
        let a = accepted("U1", Stage::Initial, dec!(500000));
        let a1 = successor(&a, dec!(700000));

        let report = compare(&[a.clone()], &[a1]);
        let row = &report.units[0].rows[0];
        assert_eq!(row.change, ChangeKind::Changed);
        assert_eq!(row.predecessor_id, Some(a.id));
        assert_eq!(row.totals.before, dec!(500000));
        assert_eq!(row.totals.after, dec!(700000));
        assert_eq!(row.totals.delta, dec!(200000));
        assert_eq!(report.grand_total.delta, dec!(200000));
    }

    #[test]
    fn test_unchanged_new_and_dangling() {
        let a = accepted("U1", Stage::Initial, dec!(100));
        let same = successor(&a, dec!(100));
        let fresh = accepted("U1", Stage::Revision(1), dec!(40));
        let mut dangling = accepted("U1", Stage::Revision(1), dec!(60));
        dangling.lineage_id = Some(ProposalId::new());

        let report = compare(&[a], &[same, fresh, dangling]);
        let unit = &report.units[0];
        let kinds: Vec<_> = unit.rows.iter().map(|r| r.change).collect();
        assert_eq!(kinds.iter().filter(|k| **k == ChangeKind::New).count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == ChangeKind::Unchanged).count(), 1);
        assert_eq!(unit.subtotal.before, dec!(100));
        assert_eq!(unit.subtotal.after, dec!(200));
        assert_eq!(unit.subtotal.delta, dec!(100));
    }

    #[test]
    fn test_blocked_and_pending_records_are_excluded() {
        let a = accepted("U1", Stage::Initial, dec!(100));
        let mut blocked = successor(&a, dec!(150));
        blocked.blocked = true;
        let mut pending = accepted("U1", Stage::Revision(1), dec!(10));
        pending.status = ReviewStatus::PendingReview;

        let report = compare(&[a], &[blocked, pending]);
        assert!(report.units.is_empty());
        assert_eq!(report.grand_total, MatrixTotals::default());
    }

    #[test]
    fn test_blocked_predecessor_makes_row_new() {
        let mut a = accepted("U1", Stage::Initial, dec!(100));
        let a1 = successor(&a, dec!(100));
        a.blocked = true;

        let report = compare(&[a], &[a1]);
        assert_eq!(report.units[0].rows[0].change, ChangeKind::New);
        assert_eq!(report.units[0].rows[0].totals.before, Decimal::ZERO);
        assert_eq!(report.units[0].rows[0].predecessor_id, None);
    }

    #[test]
    fn test_pending_predecessor_makes_row_new() {
        let mut a = accepted("U1", Stage::Initial, dec!(80));
        let a1 = successor(&a, dec!(120));
        a.status = ReviewStatus::NeedsRevision;

        let report = compare(&[a], &[a1]);
        let row = &report.units[0].rows[0];
        assert_eq!(row.change, ChangeKind::New);
        assert_eq!(row.totals.delta, dec!(120));
    }

    #[test]
    fn test_units_sorted_and_named() {
        let u2 = accepted("U2", Stage::Revision(1), dec!(1));
        let u1 = accepted("U1", Stage::Revision(1), dec!(2));
        let names = HashMap::from([(UnitId::parse("U1").unwrap(), "Finance".to_string())]);

        let report = VarianceComparator::compare(
            Stage::Initial,
            Stage::Revision(1),
            &[],
            &[u2, u1],
            &names,
            Utc::now(),
        );
        assert_eq!(report.units[0].unit_name, "Finance");
        assert_eq!(report.units[1].unit_name, "U2");
        assert_eq!(report.row_count(), 2);
        assert_eq!(report.grand_total.after, dec!(3));
    }
}
