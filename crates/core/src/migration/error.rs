//! Migration errors.

use pagu_shared::auth::Role;
use thiserror::Error;

use crate::stage::Stage;

/// Migration request rejected before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// Initial has nothing to migrate from.
    #[error("{0} has no predecessor stage")]
    NoPredecessor(Stage),

    /// Source and destination are the same stage.
    #[error("Cannot migrate {0} into itself")]
    SameStage(Stage),

    /// Source is not the stage right before the destination.
    #[error("Cannot migrate {source_stage} into {destination}: stages are not adjacent")]
    NotAdjacent {
        /// Requested source.
        source_stage: Stage,
        /// Requested destination.
        destination: Stage,
    },

    /// Destination has not been activated.
    #[error("{destination} is not active (active revision: {active_revision})")]
    StageNotActive {
        /// Requested destination.
        destination: Stage,
        /// Active revision number.
        active_revision: u8,
    },

    /// The actor may not migrate the requested scope.
    #[error("Role {0} may not migrate this scope")]
    ScopeNotPermitted(Role),
}

impl MigrationError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NoPredecessor(_) | Self::SameStage(_) | Self::NotAdjacent { .. } => 400,
            Self::StageNotActive { .. } => 409,
            Self::ScopeNotPermitted(_) => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoPredecessor(_) => "NO_PREDECESSOR",
            Self::SameStage(_) => "SAME_STAGE",
            Self::NotAdjacent { .. } => "STAGES_NOT_ADJACENT",
            Self::StageNotActive { .. } => "STAGE_NOT_ACTIVE",
            Self::ScopeNotPermitted(_) => "SCOPE_NOT_PERMITTED",
        }
    }
}
