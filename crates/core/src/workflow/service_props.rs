//! Property-based tests for WorkflowService.

use proptest::prelude::*;
use uuid::Uuid;

use pagu_shared::types::{UnitId, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{Actor, ReviewStatus, WorkflowAction};

/// Strategy for generating random ReviewStatus values.
fn arb_status() -> impl Strategy<Value = ReviewStatus> {
    prop_oneof![
        Just(ReviewStatus::PendingReview),
        Just(ReviewStatus::Accepted),
        Just(ReviewStatus::Rejected),
        Just(ReviewStatus::NeedsRevision),
    ]
}

/// Strategy for generating reviewer-side actors.
fn arb_reviewer() -> impl Strategy<Value = Actor> {
    (any::<u128>(), any::<bool>()).prop_map(|(raw, admin)| {
        let user = UserId::from_uuid(Uuid::from_u128(raw));
        if admin {
            Actor::administrator(user)
        } else {
            Actor::reviewer(user)
        }
    })
}

/// Strategy for generating unit actors.
fn arb_unit_actor() -> impl Strategy<Value = Actor> {
    (any::<u128>(), "[A-Z]{2,6}").prop_map(|(raw, code)| {
        Actor::unit(
            UserId::from_uuid(Uuid::from_u128(raw)),
            UnitId::parse(&code).unwrap(),
        )
    })
}

/// The FSM edges, independent of the implementation.
fn is_edge(from: ReviewStatus, to: ReviewStatus) -> bool {
    use ReviewStatus::{Accepted, NeedsRevision, PendingReview, Rejected};
    matches!(
        (from, to),
        (PendingReview | NeedsRevision, Accepted | Rejected | NeedsRevision)
            | (Accepted | Rejected, PendingReview)
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: transitions succeed exactly on FSM edges
    // =========================================================================

    #[test]
    fn prop_transition_matches_fsm(
        from in arb_status(),
        to in arb_status(),
        actor in arb_reviewer(),
    ) {
        let result = WorkflowService::transition(from, to, &actor, None);
        if is_edge(from, to) {
            let action = result.unwrap();
            prop_assert_eq!(action.new_status(), to);
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                WorkflowError::InvalidTransition { from, to }
            );
        }
    }

    // =========================================================================
    // Property 2: unit users never change review status
    // =========================================================================

    #[test]
    fn prop_unit_actor_never_transitions(
        from in arb_status(),
        to in arb_status(),
        actor in arb_unit_actor(),
    ) {
        let result = WorkflowService::transition(from, to, &actor, None);
        let is_not_permitted = matches!(result, Err(WorkflowError::NotPermitted { .. }));
        prop_assert!(is_not_permitted);
    }

    // =========================================================================
    // Property 3: audit fields name the acting reviewer
    // =========================================================================

    #[test]
    fn prop_review_records_reviewer(
        actor in arb_reviewer(),
        note in proptest::option::of("[a-z]{1,20}"),
    ) {
        let action = WorkflowService::review(
            ReviewStatus::PendingReview,
            ReviewStatus::Accepted,
            &actor,
            note.clone(),
        ).unwrap();
        if let WorkflowAction::Review { reviewed_by, note: recorded, .. } = action {
            prop_assert_eq!(reviewed_by, actor.user_id);
            prop_assert_eq!(recorded, note);
        } else {
            prop_assert!(false, "Expected Review action");
        }
    }
}
