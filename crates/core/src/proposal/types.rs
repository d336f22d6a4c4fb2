//! The proposal record.

use chrono::{DateTime, Utc};
use pagu_shared::types::{ProposalId, UnitId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proposal::monthly::MonthlyAmounts;
use crate::proposal::validation::ValidatedProposal;
use crate::stage::Stage;
use crate::workflow::ReviewStatus;

/// Classification of a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Spending category (e.g. goods, capital, personnel).
    pub category: String,
    /// Optional finer grouping inside the category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Activity title shown on reports.
    pub activity: String,
}

/// One budgeted line item within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    /// Record id, stable within its stage.
    pub id: ProposalId,
    /// Owning unit.
    pub unit_id: UnitId,
    /// Stage the record belongs to.
    pub stage: Stage,
    /// Category, subcategory and activity.
    pub classification: Classification,
    /// Unit of measure of `quantity` (e.g. "package", "person-day").
    pub unit_label: String,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
    /// `quantity × unit_price`, always recomputed on write.
    pub total: Decimal,
    /// Planned monthly disbursement.
    pub planned: MonthlyAmounts,
    /// Executed monthly disbursement.
    pub executed: MonthlyAmounts,
    /// Review status.
    pub status: ReviewStatus,
    /// Excluded from every aggregate while set.
    pub blocked: bool,
    /// Record in the previous stage this one supersedes.
    pub lineage_id: Option<ProposalId>,
    /// Latest reviewer note.
    pub reviewer_note: Option<String>,
    /// User who created the record.
    pub created_by: Option<UserId>,
    /// When the record was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl ProposalRecord {
    /// Creates a fresh PendingReview record from validated input.
    #[must_use]
    pub fn new(
        unit_id: UnitId,
        stage: Stage,
        input: ValidatedProposal,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            unit_id,
            stage,
            classification: input.classification,
            unit_label: input.unit_label,
            quantity: input.quantity,
            unit_price: input.unit_price,
            total: input.total,
            planned: input.planned,
            executed: MonthlyAmounts::ZERO,
            status: ReviewStatus::PendingReview,
            blocked: false,
            lineage_id: None,
            reviewer_note: None,
            created_by,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the content fields with validated input, keeping identity,
    /// status, lineage and execution data.
    pub fn apply(&mut self, input: ValidatedProposal, now: DateTime<Utc>) {
        self.classification = input.classification;
        self.unit_label = input.unit_label;
        self.quantity = input.quantity;
        self.unit_price = input.unit_price;
        self.total = input.total;
        self.planned = input.planned;
        self.updated_at = now;
    }

    /// Builds the next-stage copy that supersedes this record.
    ///
    /// Money and classification carry over, the plan carries forward, execution
    /// starts from zero and the copy goes back to review.
    #[must_use]
    pub fn carry_forward(
        &self,
        destination: Stage,
        migrated_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            unit_id: self.unit_id.clone(),
            stage: destination,
            classification: self.classification.clone(),
            unit_label: self.unit_label.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            total: self.total,
            planned: self.planned,
            executed: MonthlyAmounts::ZERO,
            status: ReviewStatus::PendingReview,
            blocked: false,
            lineage_id: Some(self.id),
            reviewer_note: None,
            created_by: migrated_by,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Accepted and not blocked: counts towards committed budget.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status == ReviewStatus::Accepted && !self.blocked
    }

    /// Counts against the ceiling: any live status except Rejected, not blocked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != ReviewStatus::Rejected && !self.blocked
    }

    /// Activity title, used as the item name in reports.
    #[must_use]
    pub fn item_name(&self) -> &str {
        &self.classification.activity
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{record, with_status};
    use super::*;
    use crate::proposal::monthly::Month;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_record_is_pending_and_unlinked() {
        let r = record("U1", Stage::Initial, dec!(10), dec!(50000));
        assert_eq!(r.total, dec!(500000));
        assert_eq!(r.status, ReviewStatus::PendingReview);
        assert!(!r.blocked);
        assert!(r.lineage_id.is_none());
        assert!(r.executed.is_zero());
    }

    #[test]
    fn test_carry_forward_resets_review_and_execution() {
        let mut source = with_status("U1", Stage::Initial, dec!(500000), ReviewStatus::Accepted);
        source.planned = MonthlyAmounts::from_pairs([(Month::Jan, dec!(500000))]);
        source.executed = MonthlyAmounts::from_pairs([(Month::Jan, dec!(100))]);
        source.reviewer_note = Some("ok".into());

        let copy = source.carry_forward(Stage::Revision(1), None, Utc::now());
        assert_ne!(copy.id, source.id);
        assert_eq!(copy.lineage_id, Some(source.id));
        assert_eq!(copy.stage, Stage::Revision(1));
        assert_eq!(copy.status, ReviewStatus::PendingReview);
        assert_eq!(copy.total, source.total);
        assert_eq!(copy.planned, source.planned);
        assert!(copy.executed.is_zero());
        assert!(copy.reviewer_note.is_none());
    }

    #[test]
    fn test_committed_and_active() {
        let mut r = with_status("U1", Stage::Initial, dec!(1), ReviewStatus::Accepted);
        assert!(r.is_committed());
        assert!(r.is_active());
        r.blocked = true;
        assert!(!r.is_committed());
        assert!(!r.is_active());

        let rejected = with_status("U1", Stage::Initial, dec!(1), ReviewStatus::Rejected);
        assert!(!rejected.is_active());
        let revise = with_status("U1", Stage::Initial, dec!(1), ReviewStatus::NeedsRevision);
        assert!(revise.is_active());
        assert!(!revise.is_committed());
    }
}
