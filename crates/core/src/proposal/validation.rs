//! Input validation for proposal writes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proposal::error::ProposalError;
use crate::proposal::monthly::MonthlyAmounts;
use crate::proposal::types::Classification;

/// Client input for creating or editing a proposal.
///
/// Any client-supplied total is ignored; it is always recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDraft {
    /// Spending category.
    pub category: String,
    /// Optional subcategory.
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Activity title.
    pub activity: String,
    /// Unit of measure.
    pub unit_label: String,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Optional initial monthly plan.
    #[serde(default)]
    pub planned: Option<MonthlyAmounts>,
}

/// A draft that passed validation, with its total computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProposal {
    /// Trimmed classification.
    pub classification: Classification,
    /// Trimmed unit of measure.
    pub unit_label: String,
    /// Quantity, positive.
    pub quantity: Decimal,
    /// Unit price, positive.
    pub unit_price: Decimal,
    /// `quantity × unit_price`, positive.
    pub total: Decimal,
    /// Monthly plan, non-negative and not above `total`.
    pub planned: MonthlyAmounts,
}

/// Largest accepted amount: a record total, a monthly amount or a ceiling.
///
/// Sums over many records stay far inside the decimal range below it.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// `quantity × unit_price`.
///
/// # Errors
///
/// Returns `ProposalError::TotalOverflow` when the product does not fit or
/// is above [`MAX_AMOUNT`].
pub fn compute_total(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, ProposalError> {
    quantity
        .checked_mul(unit_price)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or(ProposalError::TotalOverflow {
            quantity,
            unit_price,
        })
}

fn required(value: &str, field: &'static str) -> Result<String, ProposalError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ProposalError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn positive(value: Decimal, field: &'static str) -> Result<Decimal, ProposalError> {
    if value > Decimal::ZERO {
        Ok(value)
    } else {
        Err(ProposalError::NonPositive { field, value })
    }
}

/// Rejects negative months in a plan or execution vector.
///
/// # Errors
///
/// Returns `ProposalError::NegativeMonthly` naming the first negative month.
pub fn ensure_non_negative(
    amounts: &MonthlyAmounts,
    kind: &'static str,
) -> Result<(), ProposalError> {
    match amounts.first_negative() {
        Some(month) => Err(ProposalError::NegativeMonthly { kind, month }),
        None => Ok(()),
    }
}

/// Year total of a plan or execution vector after range checks.
///
/// # Errors
///
/// `ProposalError::NegativeMonthly` for a negative month,
/// `ProposalError::MonthlyOutOfRange` for a month above [`MAX_AMOUNT`] or a
/// sum that does not fit.
pub fn monthly_total(amounts: &MonthlyAmounts, kind: &'static str) -> Result<Decimal, ProposalError> {
    ensure_non_negative(amounts, kind)?;
    if amounts.iter().any(|(_, amount)| amount > MAX_AMOUNT) {
        return Err(ProposalError::MonthlyOutOfRange { kind });
    }
    amounts
        .checked_total()
        .ok_or(ProposalError::MonthlyOutOfRange { kind })
}

impl ProposalDraft {
    /// Validates the draft and computes its total.
    ///
    /// # Errors
    ///
    /// Returns the first `ProposalError` found.
    pub fn validate(self) -> Result<ValidatedProposal, ProposalError> {
        let category = required(&self.category, "category")?;
        let activity = required(&self.activity, "activity")?;
        let unit_label = required(&self.unit_label, "unit_label")?;
        let subcategory = self
            .subcategory
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let quantity = positive(self.quantity, "quantity")?;
        let unit_price = positive(self.unit_price, "unit_price")?;
        let total = positive(compute_total(quantity, unit_price)?, "total")?;

        let planned = self.planned.unwrap_or_default();
        let planned_total = monthly_total(&planned, "planned")?;
        if planned_total > total {
            return Err(ProposalError::PlanExceedsTotal {
                planned: planned_total,
                total,
            });
        }

        Ok(ValidatedProposal {
            classification: Classification {
                category,
                subcategory,
                activity,
            },
            unit_label,
            quantity,
            unit_price,
            total,
            planned,
        })
    }
}
