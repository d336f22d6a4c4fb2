//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `ProposalId` where a `UserId` is expected.
//! Units are addressed by their short institutional code rather than a UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user.");
typed_id!(ProposalId, "Identifier of a proposal record, stable within its stage.");
typed_id!(HistoryId, "Unique identifier for a history entry.");

/// Maximum length of a unit code.
pub const MAX_UNIT_CODE_LEN: usize = 32;

/// Code of an organizational unit (budget holder), e.g. `"TI"` or `"AKT-D3"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

/// Error returned when a unit code is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitIdError {
    /// The code is empty after trimming.
    #[error("unit code cannot be empty")]
    Empty,
    /// The code is longer than [`MAX_UNIT_CODE_LEN`].
    #[error("unit code is longer than {MAX_UNIT_CODE_LEN} characters")]
    TooLong,
    /// The code contains characters other than ASCII alphanumerics, `-` and `_`.
    #[error("unit code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

impl UnitId {
    /// Parses and normalizes a unit code (trimmed, upper-cased).
    pub fn parse(code: &str) -> Result<Self, UnitIdError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(UnitIdError::Empty);
        }
        if code.len() > MAX_UNIT_CODE_LEN {
            return Err(UnitIdError::TooLong);
        }
        if let Some(bad) = code
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(UnitIdError::InvalidCharacter(bad));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UnitId {
    type Err = UnitIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
