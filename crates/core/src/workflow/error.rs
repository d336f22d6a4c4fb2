//! Workflow error types for the proposal review lifecycle.

use pagu_shared::auth::Role;
use thiserror::Error;

use crate::workflow::types::ReviewStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ReviewStatus,
        /// The attempted target status.
        to: ReviewStatus,
    },

    /// The actor's role does not allow the operation.
    #[error("Role {role} may not {action}")]
    NotPermitted {
        /// The attempted operation.
        action: &'static str,
        /// The actor's role.
        role: Role,
    },

    /// A unit user touched another unit's record.
    #[error("Proposal belongs to another unit")]
    NotOwner,

    /// A unit user tried to edit or delete an Accepted record.
    #[error("Accepted proposals can only be changed by a reviewer")]
    CannotEditAccepted,

    /// Only Accepted records can be blocked.
    #[error("Only accepted proposals can be blocked, this one is {0}")]
    BlockRequiresAccepted(ReviewStatus),

    /// Execution can only be recorded against committed budget.
    #[error("Execution can only be recorded on accepted, unblocked proposals")]
    ExecutionRequiresCommitted,

    /// Rejected proposals carry no disbursement plan.
    #[error("Cannot plan disbursement for a rejected proposal")]
    PlanOnRejected,
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. }
            | Self::BlockRequiresAccepted(_)
            | Self::ExecutionRequiresCommitted
            | Self::PlanOnRejected => 400,

            Self::NotPermitted { .. } | Self::NotOwner | Self::CannotEditAccepted => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotPermitted { .. } => "NOT_PERMITTED",
            Self::NotOwner => "NOT_OWNER",
            Self::CannotEditAccepted => "CANNOT_EDIT_ACCEPTED",
            Self::BlockRequiresAccepted(_) => "BLOCK_REQUIRES_ACCEPTED",
            Self::ExecutionRequiresCommitted => "EXECUTION_REQUIRES_COMMITTED",
            Self::PlanOnRejected => "PLAN_ON_REJECTED",
        }
    }
}
