//! Realization recap: committed budget against plan and execution, grouped by
//! unit and classification.

use pagu_shared::types::UnitId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::proposal::ProposalRecord;

/// Optional recap filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecapFilter {
    /// Only this unit.
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    /// Only this category.
    #[serde(default)]
    pub category: Option<String>,
    /// Only this subcategory.
    #[serde(default)]
    pub subcategory: Option<String>,
}

impl RecapFilter {
    fn matches(&self, record: &ProposalRecord) -> bool {
        self.unit_id.as_ref().is_none_or(|u| *u == record.unit_id)
            && self
                .category
                .as_ref()
                .is_none_or(|c| *c == record.classification.category)
            && self
                .subcategory
                .as_ref()
                .is_none_or(|s| record.classification.subcategory.as_ref() == Some(s))
    }
}

/// One (unit, category, subcategory) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecapRow {
    /// Unit code.
    pub unit_id: UnitId,
    /// Category.
    pub category: String,
    /// Subcategory.
    pub subcategory: Option<String>,
    /// Number of committed records in the group.
    pub items: usize,
    /// Sum of committed totals.
    pub total_accepted: Decimal,
    /// Sum of planned amounts.
    pub total_planned: Decimal,
    /// Sum of executed amounts.
    pub total_executed: Decimal,
    /// Executed over planned, in percent with two decimals.
    pub execution_rate: Decimal,
}

/// Execution as a percentage of plan; 0 when nothing is planned.
#[must_use]
pub fn execution_rate(executed: Decimal, planned: Decimal) -> Decimal {
    if planned.is_zero() {
        return Decimal::ZERO;
    }
    (executed * Decimal::ONE_HUNDRED / planned)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Groups the committed records of one stage.
///
/// Rows are ordered by unit, category and subcategory.
#[must_use]
pub fn recap(records: &[ProposalRecord], filter: &RecapFilter) -> Vec<RecapRow> {
    let mut groups: BTreeMap<(UnitId, String, Option<String>), RecapRow> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| r.is_committed() && filter.matches(r))
    {
        let key = (
            record.unit_id.clone(),
            record.classification.category.clone(),
            record.classification.subcategory.clone(),
        );
        let row = groups.entry(key).or_insert_with(|| RecapRow {
            unit_id: record.unit_id.clone(),
            category: record.classification.category.clone(),
            subcategory: record.classification.subcategory.clone(),
            items: 0,
            total_accepted: Decimal::ZERO,
            total_planned: Decimal::ZERO,
            total_executed: Decimal::ZERO,
            execution_rate: Decimal::ZERO,
        });
        row.items += 1;
        row.total_accepted += record.total;
        row.total_planned += record.planned.total();
        row.total_executed += record.executed.total();
    }

    groups
        .into_values()
        .map(|mut row| {
            row.execution_rate = execution_rate(row.total_executed, row.total_planned);
            row
        })
        .collect()
}
