//! Matrix report types.

use chrono::{DateTime, Utc};
use pagu_shared::types::{ProposalId, UnitId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// How a current-stage item relates to the previous stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Linked, and the total moved.
    Changed,
    /// Linked, same total.
    Unchanged,
    /// No resolvable predecessor.
    New,
}

impl ChangeKind {
    /// Classifies a linked row by its delta.
    #[must_use]
    pub fn from_delta(delta: Decimal) -> Self {
        if delta.is_zero() {
            Self::Unchanged
        } else {
            Self::Changed
        }
    }
}

/// Before, after and delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixTotals {
    /// Previous-stage amount.
    pub before: Decimal,
    /// Current-stage amount.
    pub after: Decimal,
    /// `after - before`.
    pub delta: Decimal,
}

impl MatrixTotals {
    /// Totals for one pair of amounts.
    #[must_use]
    pub fn new(before: Decimal, after: Decimal) -> Self {
        Self {
            before,
            after,
            delta: after - before,
        }
    }

    /// Adds another row or subtotal.
    pub fn add(&mut self, other: &Self) {
        self.before += other.before;
        self.after += other.after;
        self.delta += other.delta;
    }
}

impl<'a> std::iter::Sum<&'a MatrixTotals> for MatrixTotals {
    fn sum<I: Iterator<Item = &'a MatrixTotals>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, t| {
            acc.add(t);
            acc
        })
    }
}

/// One current-stage item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
    /// Current-stage record.
    pub record_id: ProposalId,
    /// Resolved predecessor, if any.
    pub predecessor_id: Option<ProposalId>,
    /// Activity title.
    pub item_name: String,
    /// Category.
    pub category: String,
    /// Subcategory.
    pub subcategory: Option<String>,
    /// Amounts.
    #[serde(flatten)]
    pub totals: MatrixTotals,
    /// Classification.
    pub change: ChangeKind,
}

/// Rows of one unit with their subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMatrix {
    /// Unit code.
    pub unit_id: UnitId,
    /// Unit display name, or the code when the name is unknown.
    pub unit_name: String,
    /// Items sorted by name.
    pub rows: Vec<MatrixRow>,
    /// Sum over `rows`.
    pub subtotal: MatrixTotals,
}

/// The complete matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixReport {
    /// Previous stage (before).
    pub previous: Stage,
    /// Current stage (after).
    pub current: Stage,
    /// Units sorted by code.
    pub units: Vec<UnitMatrix>,
    /// Sum over all units.
    pub grand_total: MatrixTotals,
    /// Report time.
    pub generated_at: DateTime<Utc>,
}

impl MatrixReport {
    /// Number of rows across all units.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.units.iter().map(|u| u.rows.len()).sum()
    }

    /// Rows of `unit`, if present.
    #[must_use]
    pub fn unit(&self, unit: &UnitId) -> Option<&UnitMatrix> {
        self.units.iter().find(|u| u.unit_id == *unit)
    }
}
