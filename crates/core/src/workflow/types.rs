//! Workflow domain types for the proposal review lifecycle.
//!
//! This module defines the review status machine, the actor performing a
//! change and the actions a successful transition produces.

use chrono::{DateTime, Utc};
use pagu_shared::auth::{Claims, Role};
use pagu_shared::types::{UnitId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review status of a proposal.
///
/// The valid transitions are:
/// - PendingReview → Accepted | Rejected | NeedsRevision (review)
/// - NeedsRevision → Accepted | Rejected | NeedsRevision (re-review after owner edits)
/// - Accepted | Rejected → PendingReview (administrative reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Submitted and waiting for a reviewer.
    PendingReview,
    /// Approved; counts towards committed budget unless blocked.
    Accepted,
    /// Turned down.
    Rejected,
    /// Sent back to the owning unit for changes.
    NeedsRevision,
}

impl ReviewStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [
        Self::PendingReview,
        Self::Accepted,
        Self::Rejected,
        Self::NeedsRevision,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::NeedsRevision => "needs_revision",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending_review" => Some(Self::PendingReview),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "needs_revision" => Some(Self::NeedsRevision),
            _ => None,
        }
    }

    /// Returns true if the owning unit may still edit or delete the record.
    #[must_use]
    pub const fn owner_can_edit(&self) -> bool {
        matches!(
            self,
            Self::PendingReview | Self::NeedsRevision | Self::Rejected
        )
    }

    /// Returns true if a reviewer decision can be taken from this status.
    #[must_use]
    pub const fn is_reviewable(&self) -> bool {
        matches!(self, Self::PendingReview | Self::NeedsRevision)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Acting role.
    pub role: Role,
    /// Unit the user acts for; always set for [`Role::Unit`].
    pub unit: Option<UnitId>,
}

impl Actor {
    /// A unit user acting for `unit`.
    #[must_use]
    pub const fn unit(user_id: UserId, unit: UnitId) -> Self {
        Self {
            user_id,
            role: Role::Unit,
            unit: Some(unit),
        }
    }

    /// A reviewer.
    #[must_use]
    pub const fn reviewer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Reviewer,
            unit: None,
        }
    }

    /// An administrator.
    #[must_use]
    pub const fn administrator(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Administrator,
            unit: None,
        }
    }

    /// Reviewer or administrator.
    #[must_use]
    pub const fn is_reviewer(&self) -> bool {
        matches!(self.role, Role::Reviewer | Role::Administrator)
    }

    /// Administrator.
    #[must_use]
    pub const fn is_administrator(&self) -> bool {
        matches!(self.role, Role::Administrator)
    }

    /// True if this is a unit user acting for `unit`.
    #[must_use]
    pub fn acts_for(&self, unit: &UnitId) -> bool {
        matches!(self.role, Role::Unit) && self.unit.as_ref() == Some(unit)
    }

    /// True if the actor may read data of `unit`.
    #[must_use]
    pub fn can_view(&self, unit: &UnitId) -> bool {
        self.is_reviewer() || self.acts_for(unit)
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id(),
            role: claims.role,
            unit: claims.unit.clone(),
        }
    }
}

/// Workflow action representing a state change with audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// A reviewer decision.
    Review {
        /// Status before the decision.
        from: ReviewStatus,
        /// Decided status.
        new_status: ReviewStatus,
        /// Reviewer's note, if any.
        note: Option<String>,
        /// The reviewer.
        reviewed_by: UserId,
        /// When the decision was taken.
        reviewed_at: DateTime<Utc>,
    },
    /// Administrative reset back to review.
    Reset {
        /// Status before the reset.
        from: ReviewStatus,
        /// Always PendingReview.
        new_status: ReviewStatus,
        /// Who reset the record.
        reset_by: UserId,
        /// When the record was reset.
        reset_at: DateTime<Utc>,
    },
    /// Block flag change; status is untouched.
    Block {
        /// Unchanged status.
        status: ReviewStatus,
        /// New flag value.
        blocked: bool,
        /// Who changed the flag.
        changed_by: UserId,
        /// When the flag changed.
        changed_at: DateTime<Utc>,
    },
}

impl WorkflowAction {
    /// Returns the status resulting from this action.
    #[must_use]
    pub const fn new_status(&self) -> ReviewStatus {
        match self {
            Self::Review { new_status, .. } | Self::Reset { new_status, .. } => *new_status,
            Self::Block { status, .. } => *status,
        }
    }
}
