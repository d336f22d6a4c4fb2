//! Authentication claims carried by bearer tokens.
//!
//! Token issuance and user provisioning live outside this system; Pagu only
//! verifies tokens and reads who is calling and on behalf of which unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{UnitId, UserId};

/// Role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A budget-holding unit submitting its own proposals.
    Unit,
    /// Reviewer deciding on proposals.
    Reviewer,
    /// Administrator: reviewer rights plus ceilings, cycle settings and global migration.
    Administrator,
}

impl Role {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Reviewer => "reviewer",
            Self::Administrator => "administrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Caller's role.
    pub role: Role,
    /// Unit the caller acts for. Required for [`Role::Unit`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitId>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, role: Role, unit: Option<UnitId>, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role,
            unit,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }

    /// True when the claims are internally consistent (unit callers name their unit).
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        !matches!(self.role, Role::Unit) || self.unit.is_some()
    }
}
