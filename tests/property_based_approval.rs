// Property-Based Testing for the approval state machine
// Checks gating and authorization invariants over arbitrary record states

mod fixtures;

use chrono::Duration;
use fixtures::*;
use form_approval::approval::{
    resubmit, ActorIdentity, ApprovedFile, FinalState, Role, StageState,
};
use form_approval::{ApprovalError, FieldValue, ReviewField, ReviewStatus, Stage, Submission};
use proptest::prelude::*;
use proptest_derive::Arbitrary;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Shape {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Arbitrary)]
struct RecordShape {
    validator: Shape,
    recommender: Shape,
    final_status: Shape,
    has_file: bool,
}

impl RecordShape {
    fn build(&self) -> Submission {
        let mut s = fresh("p-1");
        s.validator = stage_state(self.validator, VALIDATOR);
        s.recommender = stage_state(self.recommender, RECOMMENDER);
        s.final_status = match self.final_status {
            Shape::Pending => FinalState::Pending,
            Shape::Approved => FinalState::Approved {
                approver: "admin".to_string(),
                date: t0(),
            },
            Shape::Rejected => FinalState::Rejected {
                approver: "admin".to_string(),
                date: t0(),
            },
        };
        if self.has_file {
            s.approved_file = Some(ApprovedFile {
                name: "sig.pdf".to_string(),
                uploaded_at: t0(),
            });
        }
        s
    }
}

fn stage_state(shape: Shape, approver: &str) -> StageState {
    match shape {
        Shape::Pending => StageState::Pending,
        Shape::Approved => StageState::Approved {
            approver: approver.to_string(),
            date: t0(),
        },
        Shape::Rejected => StageState::Rejected {
            approver: approver.to_string(),
            date: t0(),
            comment: "needs rework".to_string(),
        },
    }
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Normal),
        Just(Role::Admin),
        Just(Role::SuperAdmin),
        Just(Role::Master),
    ]
}

// Any username except the configured validators
fn non_validator_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(RECOMMENDER.to_string()),
        Just("admin".to_string()),
        Just("alice".to_string()),
        Just("Siva".to_string()),
        "[a-z]{1,10}",
    ]
    .prop_filter("must not be a validator", |name| {
        !policy().validator_identities.contains(name)
    })
}

proptest! {
    #[test]
    fn final_approval_succeeds_only_when_every_precondition_holds(shape in any::<RecordShape>()) {
        let record = shape.build();
        let result = machine().apply_transition_at(
            &record,
            ReviewField::FinalStatus,
            FieldValue::Status(ReviewStatus::Approved),
            &approver(),
            None,
            t0() + Duration::hours(1),
        );

        if !record.final_status.is_pending() {
            let is_invalid = matches!(result, Err(ApprovalError::InvalidTransition { .. }));
            prop_assert!(is_invalid);
        } else if record.ready_for_final_approval() {
            let next = result.unwrap();
            prop_assert!(next.final_status.is_approved());
            prop_assert!(next.both_stages_approved() && next.approved_file.is_some());
        } else {
            let is_gated = matches!(result, Err(ApprovalError::PreconditionNotMet { .. }));
            prop_assert!(is_gated);
        }
    }

    #[test]
    fn only_validator_identities_write_the_validator_stage(
        shape in any::<RecordShape>(),
        username in non_validator_strategy(),
        role in role_strategy(),
        reject in any::<bool>(),
    ) {
        let record = shape.build();
        let actor = ActorIdentity::new(username, role);
        let value = if reject { ReviewStatus::Rejected } else { ReviewStatus::Approved };

        let result = machine().apply_transition_at(
            &record,
            ReviewField::Stage(Stage::Validator),
            FieldValue::Status(value),
            &actor,
            Some("comment"),
            t0(),
        );
        let is_unauthorized = matches!(result, Err(ApprovalError::Unauthorized { .. }));
        prop_assert!(is_unauthorized);
    }

    #[test]
    fn stage_rejection_without_reason_never_applies(
        shape in any::<RecordShape>(),
        blank in "[ \t]{0,4}",
    ) {
        let record = shape.build();
        let result = machine().apply_transition_at(
            &record,
            ReviewField::Stage(Stage::Recommender),
            FieldValue::Status(ReviewStatus::Rejected),
            &recommender(),
            Some(blank.as_str()),
            t0(),
        );
        prop_assert_eq!(
            result,
            Err(ApprovalError::MissingRejectionReason { stage: Stage::Recommender })
        );
    }

    #[test]
    fn finally_rejected_requests_resubmit_at_most_once(shape in any::<RecordShape>()) {
        let mut record = shape.build();
        record.final_status = FinalState::Rejected {
            approver: "admin".to_string(),
            date: t0(),
        };

        let first = resubmit(&record, &[record.clone()], &applicant(), request_fields("FU-1"), t0())
            .unwrap();
        let replacement = first.active().clone();
        let all = vec![replacement.clone(), record.clone()];

        let second = resubmit(&record, &all, &applicant(), request_fields("FU-1"), t0());
        prop_assert_eq!(
            second,
            Err(ApprovalError::AlreadyResubmitted {
                original: record.id.clone(),
                existing: replacement.id.clone(),
            })
        );
    }
}
