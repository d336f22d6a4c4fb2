//! History entries appended for every change to a proposal.

use chrono::{DateTime, Utc};
use pagu_shared::types::{HistoryId, ProposalId, UnitId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::proposal::ProposalRecord;
use crate::stage::Stage;
use crate::workflow::types::{Actor, WorkflowAction};

/// Kind of change recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Record submitted.
    Created,
    /// Content edited.
    Updated,
    /// Record deleted.
    Deleted,
    /// Reviewer decision.
    Reviewed,
    /// Administrative reset to PendingReview.
    Reset,
    /// Excluded from aggregation.
    Blocked,
    /// Included in aggregation again.
    Unblocked,
    /// Monthly plan saved.
    PlanSaved,
    /// Monthly execution saved.
    ExecutionSaved,
    /// Carried forward from the previous stage.
    Migrated,
}

impl HistoryAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Reviewed => "reviewed",
            Self::Reset => "reset",
            Self::Blocked => "blocked",
            Self::Unblocked => "unblocked",
            Self::PlanSaved => "plan_saved",
            Self::ExecutionSaved => "execution_saved",
            Self::Migrated => "migrated",
        }
    }

    /// Parses an action from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Created,
            Self::Updated,
            Self::Deleted,
            Self::Reviewed,
            Self::Reset,
            Self::Blocked,
            Self::Unblocked,
            Self::PlanSaved,
            Self::ExecutionSaved,
            Self::Migrated,
        ]
        .into_iter()
        .find(|a| a.as_str() == s)
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a record's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry id.
    pub id: HistoryId,
    /// Record the entry belongs to.
    pub record_id: ProposalId,
    /// Stage of the record.
    pub stage: Stage,
    /// Owning unit of the record.
    pub unit_id: UnitId,
    /// What happened.
    pub action: HistoryAction,
    /// Who did it; `None` for system operations.
    pub actor: Option<UserId>,
    /// Free-form detail (reviewer note, status change, source record).
    pub detail: Option<String>,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Entry for `record` performed by `actor`.
    #[must_use]
    pub fn new(
        record: &ProposalRecord,
        action: HistoryAction,
        actor: Option<&Actor>,
        detail: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryId::new(),
            record_id: record.id,
            stage: record.stage,
            unit_id: record.unit_id.clone(),
            action,
            actor: actor.map(|a| a.user_id),
            detail,
            at,
        }
    }

    /// Entry describing a workflow action.
    #[must_use]
    pub fn for_action(record: &ProposalRecord, action: &WorkflowAction, actor: &Actor) -> Self {
        match action {
            WorkflowAction::Review {
                from,
                new_status,
                note,
                reviewed_at,
                ..
            } => {
                let detail = match note {
                    Some(note) => format!("{from} -> {new_status}: {note}"),
                    None => format!("{from} -> {new_status}"),
                };
                Self::new(
                    record,
                    HistoryAction::Reviewed,
                    Some(actor),
                    Some(detail),
                    *reviewed_at,
                )
            }
            WorkflowAction::Reset {
                from,
                new_status,
                reset_at,
                ..
            } => Self::new(
                record,
                HistoryAction::Reset,
                Some(actor),
                Some(format!("{from} -> {new_status}")),
                *reset_at,
            ),
            WorkflowAction::Block {
                blocked,
                changed_at,
                ..
            } => Self::new(
                record,
                if *blocked {
                    HistoryAction::Blocked
                } else {
                    HistoryAction::Unblocked
                },
                Some(actor),
                None,
                *changed_at,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::types::fixtures::record;
    use crate::workflow::types::ReviewStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_action_parse_round_trip() {
        for action in [
            HistoryAction::Created,
            HistoryAction::PlanSaved,
            HistoryAction::Migrated,
        ] {
            assert_eq!(HistoryAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(HistoryAction::parse("voided"), None);
    }

    #[test]
    fn test_review_entry_carries_note() {
        let r = record("U1", Stage::Initial, dec!(1), dec!(10));
        let actor = Actor::reviewer(UserId::new());
        let action = WorkflowAction::Review {
            from: ReviewStatus::PendingReview,
            new_status: ReviewStatus::NeedsRevision,
            note: Some("split the item".into()),
            reviewed_by: actor.user_id,
            reviewed_at: Utc::now(),
        };
        let entry = HistoryEntry::for_action(&r, &action, &actor);
        assert_eq!(entry.action, HistoryAction::Reviewed);
        assert_eq!(entry.record_id, r.id);
        assert_eq!(entry.actor, Some(actor.user_id));
        assert_eq!(
            entry.detail.as_deref(),
            Some("pending_review -> needs_revision: split the item")
        );
    }

    #[test]
    fn test_block_entry() {
        let r = record("U1", Stage::Initial, dec!(1), dec!(10));
        let actor = Actor::administrator(UserId::new());
        let action = WorkflowAction::Block {
            status: ReviewStatus::Accepted,
            blocked: false,
            changed_by: actor.user_id,
            changed_at: Utc::now(),
        };
        let entry = HistoryEntry::for_action(&r, &action, &actor);
        assert_eq!(entry.action, HistoryAction::Unblocked);
    }
}
