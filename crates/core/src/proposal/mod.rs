//! Proposal records: one budgeted line item within a stage.

pub mod error;
pub mod monthly;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::ProposalError;
pub use monthly::{Month, MonthlyAmounts, percentage_of};
pub use types::{Classification, ProposalRecord};
pub use validation::{MAX_AMOUNT, ProposalDraft, ValidatedProposal, compute_total, monthly_total};
