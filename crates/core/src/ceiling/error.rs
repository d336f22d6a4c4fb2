//! Ceiling errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Ceiling rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CeilingError {
    /// Projected Initial-stage total is above the ceiling.
    #[error("Projected total {projected} exceeds ceiling {ceiling}")]
    Exceeded {
        /// Active total including the rejected write.
        projected: Decimal,
        /// The unit's ceiling.
        ceiling: Decimal,
    },

    /// Amount is negative or above the supported maximum.
    #[error("Amount {0} is outside the supported range")]
    AmountOutOfRange(Decimal),

    /// Ceilings cannot be negative.
    #[error("Ceiling must not be negative, got {0}")]
    Negative(Decimal),
}

impl CeilingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Exceeded { .. } => 422,
            Self::AmountOutOfRange(_) | Self::Negative(_) => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Exceeded { .. } => "CEILING_EXCEEDED",
            Self::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            Self::Negative(_) => "INVALID_CEILING",
        }
    }
}
