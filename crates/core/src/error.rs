//! Umbrella error for engine operations.

use pagu_shared::types::{ProposalId, UnitId};
use thiserror::Error;

use crate::ceiling::CeilingError;
use crate::migration::MigrationError;
use crate::proposal::ProposalError;
use crate::stage::{Stage, StageError};
use crate::store::StoreError;
use crate::workflow::WorkflowError;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Any failure of an engine operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unresolvable stage.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Input rejected before any write.
    #[error(transparent)]
    Validation(#[from] ProposalError),

    /// Workflow rule violated.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Write would exceed the unit ceiling.
    #[error(transparent)]
    Ceiling(#[from] CeilingError),

    /// Migration request rejected.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No such record in the stage.
    #[error("Proposal {id} not found in {stage}")]
    ProposalNotFound {
        /// Stage searched.
        stage: Stage,
        /// Requested id.
        id: ProposalId,
    },

    /// No such unit.
    #[error("Unit {0} not found")]
    UnitNotFound(UnitId),

    /// The stage's submission window is closed.
    #[error("{0} is not open for submissions")]
    StageClosed(Stage),

    /// The stage has not been activated yet.
    #[error("{0} has not been activated")]
    StageNotActive(Stage),

    /// The record was carried into the next stage and is reference data now.
    #[error("Proposal {id} was carried into {successor} and is read-only")]
    Superseded {
        /// The superseded record.
        id: ProposalId,
        /// Stage holding its successor.
        successor: Stage,
    },

    /// The actor may not perform the operation.
    #[error("Access denied: {0}")]
    Forbidden(String),
}

impl CoreError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Stage(e) => e.status_code(),
            Self::Validation(e) => e.status_code(),
            Self::Workflow(e) => e.status_code(),
            Self::Ceiling(e) => e.status_code(),
            Self::Migration(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
            Self::ProposalNotFound { .. } | Self::UnitNotFound(_) => 404,
            Self::StageClosed(_) | Self::StageNotActive(_) | Self::Superseded { .. } => 409,
            Self::Forbidden(_) => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Stage(e) => e.error_code(),
            Self::Validation(e) => e.error_code(),
            Self::Workflow(e) => e.error_code(),
            Self::Ceiling(e) => e.error_code(),
            Self::Migration(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::ProposalNotFound { .. } => "PROPOSAL_NOT_FOUND",
            Self::UnitNotFound(_) => "UNIT_NOT_FOUND",
            Self::StageClosed(_) => "STAGE_CLOSED",
            Self::StageNotActive(_) => "STAGE_NOT_ACTIVE",
            Self::Superseded { .. } => "SUPERSEDED",
            Self::Forbidden(_) => "FORBIDDEN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wrapped_errors_keep_their_codes() {
        let err: CoreError = CeilingError::Exceeded {
            projected: dec!(1100000),
            ceiling: dec!(1000000),
        }
        .into();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "CEILING_EXCEEDED");
        assert_eq!(
            err.to_string(),
            "Projected total 1100000 exceeds ceiling 1000000"
        );

        let err: CoreError = StoreError::Database("connection reset".into()).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "STORE_ERROR");
    }

    #[test]
    fn test_own_variants() {
        let err = CoreError::ProposalNotFound {
            stage: Stage::Revision(2),
            id: ProposalId::new(),
        };
        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("Revision 2"));
        assert_eq!(CoreError::StageClosed(Stage::Initial).status_code(), 409);
        assert_eq!(CoreError::Forbidden("x".into()).status_code(), 403);
    }
}
