//! Ceiling check over a unit's active Initial-stage records.

use pagu_shared::types::ProposalId;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ceiling::error::CeilingError;
use crate::proposal::{MAX_AMOUNT, ProposalRecord};
use crate::stage::Stage;

/// Outcome of a ceiling check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CeilingCheck {
    /// True if `projected_total <= ceiling`.
    pub allowed: bool,
    /// Active total after the write.
    pub projected_total: Decimal,
    /// The unit's ceiling.
    pub ceiling: Decimal,
    /// `ceiling - projected_total`; negative when over.
    pub remaining: Decimal,
}

impl CeilingCheck {
    /// Converts a disallowed check into an error.
    ///
    /// # Errors
    ///
    /// Returns `CeilingError::Exceeded` when the check did not pass.
    pub fn into_result(self) -> Result<Self, CeilingError> {
        if self.allowed {
            Ok(self)
        } else {
            Err(CeilingError::Exceeded {
                projected: self.projected_total,
                ceiling: self.ceiling,
            })
        }
    }
}

/// Stateless ceiling checks.
pub struct CeilingGuard;

impl CeilingGuard {
    /// Sum of the unit's active Initial records, optionally leaving one out.
    ///
    /// Callers pass the unit's Initial-stage records; records of other stages
    /// are ignored.
    #[must_use]
    pub fn active_total(records: &[ProposalRecord], exclude: Option<ProposalId>) -> Decimal {
        active_totals(records, exclude).fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Checks whether adding `prospective` keeps the unit within `ceiling`.
    ///
    /// `exclude` names the record being edited, whose old total must not be
    /// counted twice.
    ///
    /// # Errors
    ///
    /// Returns `CeilingError::AmountOutOfRange` for a negative `prospective`,
    /// one above [`MAX_AMOUNT`], or a projection that does not fit.
    pub fn check(
        ceiling: Decimal,
        records: &[ProposalRecord],
        exclude: Option<ProposalId>,
        prospective: Decimal,
    ) -> Result<CeilingCheck, CeilingError> {
        let out_of_range = CeilingError::AmountOutOfRange(prospective);
        if prospective < Decimal::ZERO || prospective > MAX_AMOUNT {
            return Err(out_of_range);
        }
        let projected_total = active_totals(records, exclude)
            .try_fold(prospective, Decimal::checked_add)
            .ok_or_else(|| out_of_range.clone())?;
        let remaining = ceiling.checked_sub(projected_total).ok_or(out_of_range)?;
        Ok(CeilingCheck {
            allowed: projected_total <= ceiling,
            projected_total,
            ceiling,
            remaining,
        })
    }

    /// Check for a write into `stage`; only the Initial stage is capped.
    ///
    /// # Errors
    ///
    /// Same as [`CeilingGuard::check`].
    pub fn check_for_stage(
        stage: Stage,
        ceiling: Decimal,
        records: &[ProposalRecord],
        exclude: Option<ProposalId>,
        prospective: Decimal,
    ) -> Result<CeilingCheck, CeilingError> {
        let check = Self::check(ceiling, records, exclude, prospective)?;
        if stage.is_initial() {
            Ok(check)
        } else {
            Ok(CeilingCheck {
                allowed: true,
                ..check
            })
        }
    }

    /// What the unit could still add without exceeding its ceiling.
    #[must_use]
    pub fn headroom(ceiling: Decimal, records: &[ProposalRecord]) -> Decimal {
        ceiling
            .saturating_sub(Self::active_total(records, None))
            .max(Decimal::ZERO)
    }
}

fn active_totals(
    records: &[ProposalRecord],
    exclude: Option<ProposalId>,
) -> impl Iterator<Item = Decimal> + '_ {
    records
        .iter()
        .filter(|r| r.stage == Stage::Initial && r.is_active())
        .filter(move |r| Some(r.id) != exclude)
        .map(|r| r.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::types::fixtures::{record, with_status};
    use crate::workflow::ReviewStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_first_submission_within_ceiling() {
        let check = CeilingGuard::check(dec!(1000000), &[], None, dec!(500000)).unwrap();
        assert!(check.allowed);
        assert_eq!(check.projected_total, dec!(500000));
        assert_eq!(check.remaining, dec!(500000));
    }

    #[test]
    fn test_second_submission_over_ceiling() {
        let existing = [record("U1", Stage::Initial, dec!(10), dec!(50000))];
        let check = CeilingGuard::check(dec!(1000000), &existing, None, dec!(600000)).unwrap();
        assert!(!check.allowed);
        assert_eq!(check.projected_total, dec!(1100000));
        assert_eq!(
            check.into_result(),
            Err(CeilingError::Exceeded {
                projected: dec!(1100000),
                ceiling: dec!(1000000),
            })
        );
    }

    #[test]
    fn test_exact_ceiling_is_allowed() {
        let existing = [record("U1", Stage::Initial, dec!(1), dec!(400000))];
        let check = CeilingGuard::check(dec!(1000000), &existing, None, dec!(600000)).unwrap();
        assert!(check.allowed);
        assert_eq!(check.remaining, Decimal::ZERO);
    }

    #[test]
    fn test_rejected_and_blocked_do_not_count() {
        let mut blocked = with_status("U1", Stage::Initial, dec!(300), ReviewStatus::Accepted);
        blocked.blocked = true;
        let records = [
            with_status("U1", Stage::Initial, dec!(100), ReviewStatus::PendingReview),
            with_status("U1", Stage::Initial, dec!(200), ReviewStatus::NeedsRevision),
            with_status("U1", Stage::Initial, dec!(400), ReviewStatus::Accepted),
            with_status("U1", Stage::Initial, dec!(999), ReviewStatus::Rejected),
            blocked,
        ];
        assert_eq!(CeilingGuard::active_total(&records, None), dec!(700));
    }

    #[test]
    fn test_edit_excludes_own_previous_total() {
        let existing = record("U1", Stage::Initial, dec!(1), dec!(900));
        let check = CeilingGuard::check(
            dec!(1000),
            std::slice::from_ref(&existing),
            Some(existing.id),
            dec!(1000),
        )
        .unwrap();
        assert!(check.allowed);
    }

    #[test]
    fn test_revision_stage_is_never_capped() {
        let existing = [record("U1", Stage::Initial, dec!(1), dec!(900))];
        let check =
            CeilingGuard::check_for_stage(Stage::Revision(1), dec!(1000), &existing, None, dec!(500))
                .unwrap();
        assert!(check.allowed);
        assert_eq!(check.projected_total, dec!(1400));
    }

    #[test]
    fn test_out_of_range_amount_is_an_error() {
        let existing = [record("U1", Stage::Initial, dec!(10), dec!(50000))];
        assert_eq!(
            CeilingGuard::check(dec!(1000000), &existing, None, Decimal::MAX),
            Err(CeilingError::AmountOutOfRange(Decimal::MAX))
        );
        assert_eq!(
            CeilingGuard::check(dec!(1000000), &existing, None, dec!(-1)),
            Err(CeilingError::AmountOutOfRange(dec!(-1)))
        );
    }

    #[test]
    fn test_max_amount_is_checked_without_overflow() {
        let existing = [record("U1", Stage::Initial, dec!(10), dec!(50000))];
        let check = CeilingGuard::check(dec!(1000000), &existing, None, MAX_AMOUNT).unwrap();
        assert!(!check.allowed);
        assert_eq!(check.projected_total, MAX_AMOUNT + dec!(500000));
    }

    #[test]
    fn test_headroom_never_negative() {
        let existing = [record("U1", Stage::Initial, dec!(1), dec!(1500))];
        assert_eq!(CeilingGuard::headroom(dec!(1000), &existing), Decimal::ZERO);
        assert_eq!(CeilingGuard::headroom(dec!(2000), &existing), dec!(500));
    }
}
