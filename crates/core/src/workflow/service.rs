//! Workflow service for proposal review transitions.
//!
//! This module implements the review state machine and the permission
//! rules that decide who may touch a record in which status.

use chrono::Utc;

use crate::proposal::ProposalRecord;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Actor, ReviewStatus, WorkflowAction};

/// Stateless service for proposal workflow transitions.
///
/// All methods are associated functions that validate a change and return
/// the resulting `WorkflowAction` with its audit data.
pub struct WorkflowService;

impl WorkflowService {
    /// Moves a record from `current` to `target`.
    ///
    /// A `PendingReview` target is an administrative reset; anything else is a
    /// reviewer decision.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` if the actor is not a reviewer
    /// * `WorkflowError::InvalidTransition` if the FSM has no such edge
    pub fn transition(
        current: ReviewStatus,
        target: ReviewStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<WorkflowAction, WorkflowError> {
        match target {
            ReviewStatus::PendingReview => Self::reset(current, actor),
            _ => Self::review(current, target, actor, note),
        }
    }

    /// Records a reviewer decision.
    ///
    /// # Arguments
    /// * `current` - The record's status
    /// * `decision` - Accepted, Rejected or NeedsRevision
    /// * `actor` - Must be a reviewer or administrator
    /// * `note` - Optional reviewer note; blank notes are dropped
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` for unit users
    /// * `WorkflowError::InvalidTransition` unless `current` is PendingReview
    ///   or NeedsRevision and `decision` is not PendingReview
    pub fn review(
        current: ReviewStatus,
        decision: ReviewStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<WorkflowAction, WorkflowError> {
        if !actor.is_reviewer() {
            return Err(WorkflowError::NotPermitted {
                action: "review proposals",
                role: actor.role,
            });
        }

        if !current.is_reviewable() || decision == ReviewStatus::PendingReview {
            return Err(WorkflowError::InvalidTransition {
                from: current,
                to: decision,
            });
        }

        Ok(WorkflowAction::Review {
            from: current,
            new_status: decision,
            note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            reviewed_by: actor.user_id,
            reviewed_at: Utc::now(),
        })
    }

    /// Sends an Accepted or Rejected record back to review.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` for unit users
    /// * `WorkflowError::InvalidTransition` from PendingReview or NeedsRevision
    pub fn reset(current: ReviewStatus, actor: &Actor) -> Result<WorkflowAction, WorkflowError> {
        if !actor.is_reviewer() {
            return Err(WorkflowError::NotPermitted {
                action: "reset proposals",
                role: actor.role,
            });
        }

        match current {
            ReviewStatus::Accepted | ReviewStatus::Rejected => Ok(WorkflowAction::Reset {
                from: current,
                new_status: ReviewStatus::PendingReview,
                reset_by: actor.user_id,
                reset_at: Utc::now(),
            }),
            _ => Err(WorkflowError::InvalidTransition {
                from: current,
                to: ReviewStatus::PendingReview,
            }),
        }
    }

    /// Sets or clears the blocked flag.
    ///
    /// Blocking requires an Accepted record; unblocking is always allowed and
    /// idempotent. Status is never changed.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` for unit users
    /// * `WorkflowError::BlockRequiresAccepted` when blocking a non-Accepted record
    pub fn set_blocked(
        record: &ProposalRecord,
        blocked: bool,
        actor: &Actor,
    ) -> Result<WorkflowAction, WorkflowError> {
        if !actor.is_reviewer() {
            return Err(WorkflowError::NotPermitted {
                action: "block proposals",
                role: actor.role,
            });
        }

        if blocked && record.status != ReviewStatus::Accepted {
            return Err(WorkflowError::BlockRequiresAccepted(record.status));
        }

        Ok(WorkflowAction::Block {
            status: record.status,
            blocked,
            changed_by: actor.user_id,
            changed_at: Utc::now(),
        })
    }

    /// Returns true if the owning unit may edit a record in `status`.
    #[must_use]
    pub const fn can_owner_edit(status: ReviewStatus) -> bool {
        status.owner_can_edit()
    }

    /// Checks that `actor` may read `record`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotOwner` for another unit's record.
    pub fn ensure_can_view(record: &ProposalRecord, actor: &Actor) -> Result<(), WorkflowError> {
        if actor.can_view(&record.unit_id) {
            Ok(())
        } else {
            Err(WorkflowError::NotOwner)
        }
    }

    /// Checks that `actor` may edit the content of `record`.
    ///
    /// Reviewers may edit anything; owners only while the status allows it.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotOwner` for another unit's record
    /// * `WorkflowError::CannotEditAccepted` for an owner editing an Accepted record
    pub fn ensure_can_edit(record: &ProposalRecord, actor: &Actor) -> Result<(), WorkflowError> {
        if actor.is_reviewer() {
            return Ok(());
        }
        if !actor.acts_for(&record.unit_id) {
            return Err(WorkflowError::NotOwner);
        }
        if Self::can_owner_edit(record.status) {
            Ok(())
        } else {
            Err(WorkflowError::CannotEditAccepted)
        }
    }

    /// Checks that `actor` may delete `record`. Same rules as editing.
    ///
    /// # Errors
    ///
    /// See [`WorkflowService::ensure_can_edit`].
    pub fn ensure_can_delete(record: &ProposalRecord, actor: &Actor) -> Result<(), WorkflowError> {
        Self::ensure_can_edit(record, actor)
    }

    /// Checks that `actor` may save the monthly plan of `record`.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotOwner` for another unit's record
    /// * `WorkflowError::PlanOnRejected` for a Rejected record
    pub fn ensure_can_plan(record: &ProposalRecord, actor: &Actor) -> Result<(), WorkflowError> {
        Self::ensure_can_view(record, actor)?;
        if record.status == ReviewStatus::Rejected {
            return Err(WorkflowError::PlanOnRejected);
        }
        Ok(())
    }

    /// Checks that `actor` may record monthly execution on `record`.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotOwner` for another unit's record
    /// * `WorkflowError::ExecutionRequiresCommitted` unless Accepted and unblocked
    pub fn ensure_can_execute(record: &ProposalRecord, actor: &Actor) -> Result<(), WorkflowError> {
        Self::ensure_can_view(record, actor)?;
        if !record.is_committed() {
            return Err(WorkflowError::ExecutionRequiresCommitted);
        }
        Ok(())
    }
}
