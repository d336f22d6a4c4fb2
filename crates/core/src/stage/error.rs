//! Stage resolution errors.

use thiserror::Error;

/// Errors raised while turning labels into stages or stages into locations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The label matches neither `Initial` nor `Revision N`.
    #[error("Unknown stage label: {0}")]
    UnknownLabel(String),

    /// The revision number is outside the provisioned range.
    #[error("Revision {number} is out of range (1..={max})")]
    RevisionOutOfRange {
        /// Requested revision number.
        number: u32,
        /// Highest provisioned revision.
        max: u8,
    },
}

impl StageError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UnknownLabel(_) | Self::RevisionOutOfRange { .. } => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownLabel(_) => "UNKNOWN_STAGE",
            Self::RevisionOutOfRange { .. } => "STAGE_OUT_OF_RANGE",
        }
    }
}
