//! Summary data types.

use chrono::{DateTime, Utc};
use pagu_shared::types::UnitId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proposal::{MonthlyAmounts, ProposalRecord, percentage_of};
use crate::stage::Stage;
use crate::workflow::ReviewStatus;

/// Record counts per review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    /// PendingReview records.
    pub pending_review: u64,
    /// Accepted records, blocked or not.
    pub accepted: u64,
    /// Rejected records.
    pub rejected: u64,
    /// NeedsRevision records.
    pub needs_revision: u64,
    /// Blocked records.
    pub blocked: u64,
}

impl StatusCounts {
    /// Counts one record.
    pub fn record(&mut self, status: ReviewStatus, blocked: bool) {
        match status {
            ReviewStatus::PendingReview => self.pending_review += 1,
            ReviewStatus::Accepted => self.accepted += 1,
            ReviewStatus::Rejected => self.rejected += 1,
            ReviewStatus::NeedsRevision => self.needs_revision += 1,
        }
        if blocked {
            self.blocked += 1;
        }
    }

    /// All records counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending_review + self.accepted + self.rejected + self.needs_revision
    }

    /// Adds another set of counts.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            pending_review: self.pending_review + other.pending_review,
            accepted: self.accepted + other.accepted,
            rejected: self.rejected + other.rejected,
            needs_revision: self.needs_revision + other.needs_revision,
            blocked: self.blocked + other.blocked,
        }
    }
}

/// Totals of one unit within one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageAggregate {
    /// Sum of totals of Accepted, unblocked records.
    pub committed: Decimal,
    /// Sum of totals of all records regardless of status.
    pub submitted: Decimal,
    /// Monthly plan of Accepted, unblocked records.
    pub planned: MonthlyAmounts,
    /// Monthly execution of Accepted, unblocked records.
    pub executed: MonthlyAmounts,
    /// Status counts over all records.
    pub counts: StatusCounts,
}

impl StageAggregate {
    /// Adds one record.
    pub fn add(&mut self, record: &ProposalRecord) {
        self.submitted += record.total;
        self.counts.record(record.status, record.blocked);
        if record.is_committed() {
            self.committed += record.total;
            self.planned += record.planned;
            self.executed += record.executed;
        }
    }

    /// Folds a stage's records.
    #[must_use]
    pub fn fold<'a>(records: impl IntoIterator<Item = &'a ProposalRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut agg, record| {
            agg.add(record);
            agg
        })
    }

    /// Combines two partial aggregates.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            committed: self.committed + other.committed,
            submitted: self.submitted + other.submitted,
            planned: self.planned + other.planned,
            executed: self.executed + other.executed,
            counts: self.counts.merge(other.counts),
        }
    }
}

/// Quarterly and half-year rollup of a monthly vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodBreakdown {
    /// Quarter sums.
    pub quarters: [Decimal; 4],
    /// Quarter shares of the yearly total, in percent (1 dp).
    pub quarter_shares: [Decimal; 4],
    /// Half-year sums.
    pub semesters: [Decimal; 2],
    /// Half-year shares of the yearly total, in percent (1 dp).
    pub semester_shares: [Decimal; 2],
}

impl PeriodBreakdown {
    /// Breaks `amounts` down against `whole`.
    #[must_use]
    pub fn of(amounts: &MonthlyAmounts, whole: Decimal) -> Self {
        let quarters = amounts.quarters();
        let semesters = amounts.semesters();
        Self {
            quarters,
            quarter_shares: quarters.map(|q| percentage_of(q, whole)),
            semesters,
            semester_shares: semesters.map(|s| percentage_of(s, whole)),
        }
    }
}

/// Per-unit rollup; entirely derived from the unit's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// The unit.
    pub unit_id: UnitId,
    /// Ceiling as set by an administrator.
    pub ceiling: Decimal,
    /// All Initial records plus active revision records, regardless of status.
    pub total_submitted: Decimal,
    /// Accepted, unblocked Initial total.
    pub initial_net_total: Decimal,
    /// Accepted, unblocked total over Initial and the active revision.
    pub current_total: Decimal,
    /// Planned total of committed records.
    pub total_planned: Decimal,
    /// Executed total of committed records.
    pub total_executed: Decimal,
    /// Monthly plan of committed records.
    pub planned_monthly: MonthlyAmounts,
    /// Monthly execution of committed records.
    pub executed_monthly: MonthlyAmounts,
    /// Status counts over the relevant stages.
    pub status_counts: StatusCounts,
    /// Revision stage included, if any.
    pub active_revision: Option<Stage>,
    /// When the summary was rebuilt.
    pub recomputed_at: DateTime<Utc>,
}

impl UnitSummary {
    /// Ceiling left after the Initial commitment.
    #[must_use]
    pub fn remaining_ceiling(&self) -> Decimal {
        self.ceiling - self.initial_net_total
    }

    /// Executed share of the plan in percent (1 dp).
    #[must_use]
    pub fn execution_rate(&self) -> Decimal {
        percentage_of(self.total_executed, self.total_planned)
    }

    /// Quarterly and half-year plan.
    #[must_use]
    pub fn planned_breakdown(&self) -> PeriodBreakdown {
        PeriodBreakdown::of(&self.planned_monthly, self.total_planned)
    }

    /// Quarterly and half-year execution, as a share of the plan.
    #[must_use]
    pub fn executed_breakdown(&self) -> PeriodBreakdown {
        PeriodBreakdown::of(&self.executed_monthly, self.total_planned)
    }
}

/// Totals over every unit's summary row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PortfolioSummary {
    /// Number of summary rows.
    pub units: usize,
    /// Sum of ceilings.
    pub total_ceiling: Decimal,
    /// Sum of submitted totals.
    pub total_submitted: Decimal,
    /// Sum of Initial commitments.
    pub initial_net_total: Decimal,
    /// Sum of current commitments.
    pub current_total: Decimal,
    /// Sum of plans.
    pub total_planned: Decimal,
    /// Sum of executions.
    pub total_executed: Decimal,
    /// Monthly plan over all units.
    pub planned_monthly: MonthlyAmounts,
    /// Monthly execution over all units.
    pub executed_monthly: MonthlyAmounts,
    /// Status counts over all units.
    pub status_counts: StatusCounts,
}
