//! The typed stage enumeration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::stage::error::StageError;

/// Highest revision number any deployment can provision.
pub const MAX_REVISION: u8 = 30;

/// A phase of the budget cycle.
///
/// Ordering follows the cycle: `Initial < Revision(1) < Revision(2) < ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// The opening stage; the only one subject to the unit ceiling.
    Initial,
    /// A numbered revision stage, `1..=MAX_REVISION`.
    Revision(u8),
}

impl Stage {
    /// Parses a stage label.
    ///
    /// Accepts the canonical labels (`Initial`, `Revision 3`) case-insensitively
    /// as well as path slugs (`initial`, `revision-3`).
    ///
    /// # Errors
    ///
    /// Returns `StageError::UnknownLabel` for anything else and
    /// `StageError::RevisionOutOfRange` for revision numbers outside `1..=MAX_REVISION`.
    pub fn parse(label: &str) -> Result<Self, StageError> {
        let normalized = label.trim().to_lowercase();
        if normalized == "initial" {
            return Ok(Self::Initial);
        }

        let number = normalized
            .strip_prefix("revision")
            .map(|rest| rest.strip_prefix([' ', '-', '_']).unwrap_or(rest))
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .ok_or_else(|| StageError::UnknownLabel(label.to_string()))?;

        Self::revision(number, MAX_REVISION)
    }

    /// Builds a revision stage, checking `1..=max`.
    ///
    /// # Errors
    ///
    /// Returns `StageError::RevisionOutOfRange` when `number` is 0 or above `max`.
    pub fn revision(number: u32, max: u8) -> Result<Self, StageError> {
        match u8::try_from(number) {
            Ok(n) if n >= 1 && n <= max => Ok(Self::Revision(n)),
            _ => Err(StageError::RevisionOutOfRange { number, max }),
        }
    }

    /// Canonical label, e.g. `Initial` or `Revision 2`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Initial => "Initial".to_string(),
            Self::Revision(n) => format!("Revision {n}"),
        }
    }

    /// URL-friendly label, e.g. `initial` or `revision-2`.
    #[must_use]
    pub fn slug(&self) -> String {
        match self {
            Self::Initial => "initial".to_string(),
            Self::Revision(n) => format!("revision-{n}"),
        }
    }

    /// Position in the cycle: 0 for Initial, `n` for Revision n.
    #[must_use]
    pub const fn index(&self) -> u8 {
        match self {
            Self::Initial => 0,
            Self::Revision(n) => *n,
        }
    }

    /// The stage this one supersedes, if any.
    #[must_use]
    pub const fn previous(&self) -> Option<Self> {
        match self {
            Self::Initial => None,
            Self::Revision(1) => Some(Self::Initial),
            Self::Revision(n) => Some(Self::Revision(*n - 1)),
        }
    }

    /// The stage that supersedes this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        match self {
            Self::Initial => Self::Revision(1),
            Self::Revision(n) => Self::Revision(n.saturating_add(1)),
        }
    }

    /// True for the Initial stage.
    #[must_use]
    pub const fn is_initial(&self) -> bool {
        matches!(self, Self::Initial)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("Initial"),
            Self::Revision(n) => write!(f, "Revision {n}"),
        }
    }
}

impl FromStr for Stage {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label).map_err(serde::de::Error::custom)
    }
}
