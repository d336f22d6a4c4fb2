//! Validation errors for proposal input.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::proposal::monthly::Month;

/// Input rejected before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalError {
    /// A required text field is empty.
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    /// Quantity, unit price or total is zero or negative.
    #[error("Field '{field}' must be positive, got {value}")]
    NonPositive {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: Decimal,
    },

    /// `quantity × unit_price` does not fit in a decimal or is above [`MAX_AMOUNT`].
    ///
    /// [`MAX_AMOUNT`]: crate::proposal::MAX_AMOUNT
    #[error("Total of {quantity} × {unit_price} is out of range")]
    TotalOverflow {
        /// Requested quantity.
        quantity: Decimal,
        /// Requested unit price.
        unit_price: Decimal,
    },

    /// A monthly amount, or the year's sum, is above [`MAX_AMOUNT`].
    ///
    /// [`MAX_AMOUNT`]: crate::proposal::MAX_AMOUNT
    #[error("Monthly {kind} amounts are outside the supported range")]
    MonthlyOutOfRange {
        /// `planned` or `executed`.
        kind: &'static str,
    },

    /// A monthly amount is negative.
    #[error("Monthly {kind} amount for {month} must not be negative")]
    NegativeMonthly {
        /// `planned` or `executed`.
        kind: &'static str,
        /// Offending month.
        month: Month,
    },

    /// The monthly plan of an Accepted record does not add up to its total.
    #[error("Monthly plan sums to {planned} but the accepted total is {total}")]
    PlanMismatch {
        /// Sum of the monthly plan.
        planned: Decimal,
        /// Record total.
        total: Decimal,
    },

    /// The monthly plan exceeds the record total.
    #[error("Monthly plan sums to {planned}, above the total {total}")]
    PlanExceedsTotal {
        /// Sum of the monthly plan.
        planned: Decimal,
        /// Record total.
        total: Decimal,
    },
}

impl ProposalError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        400
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::NonPositive { .. } => "NON_POSITIVE_AMOUNT",
            Self::TotalOverflow { .. } => "TOTAL_OUT_OF_RANGE",
            Self::MonthlyOutOfRange { .. } => "MONTHLY_OUT_OF_RANGE",
            Self::NegativeMonthly { .. } => "NEGATIVE_MONTHLY_AMOUNT",
            Self::PlanMismatch { .. } => "PLAN_MISMATCH",
            Self::PlanExceedsTotal { .. } => "PLAN_EXCEEDS_TOTAL",
        }
    }
}
