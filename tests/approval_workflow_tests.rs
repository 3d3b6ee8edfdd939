// End-to-end review of a single access request through the pure state machine

mod fixtures;

use chrono::Duration;
use fixtures::*;
use form_approval::approval::{MissingPrecondition, StageState};
use form_approval::{ApprovalError, FieldValue, ReviewField, ReviewStatus, Stage};

fn status(value: ReviewStatus) -> FieldValue {
    FieldValue::Status(value)
}

#[test]
fn test_full_review_scenario() {
    let m = machine();
    let s = fresh("1");

    // (a) validator approves
    let s = m
        .apply_transition_at(&s, ReviewField::Stage(Stage::Validator), status(ReviewStatus::Approved), &validator(), None, t0())
        .unwrap();
    assert_eq!(s.stage_status(Stage::Validator), ReviewStatus::Approved);

    // (b) recommender approves
    let s = m
        .apply_transition_at(&s, ReviewField::Stage(Stage::Recommender), status(ReviewStatus::Approved), &recommender(), None, t0())
        .unwrap();
    assert_eq!(s.stage_status(Stage::Recommender), ReviewStatus::Approved);

    // (c) final approval without the signed file
    let err = m
        .apply_transition_at(&s, ReviewField::FinalStatus, status(ReviewStatus::Approved), &approver(), None, t0())
        .unwrap_err();
    assert_eq!(
        err,
        ApprovalError::PreconditionNotMet {
            missing: vec![MissingPrecondition::ApprovedFile]
        }
    );

    // (d) attach the signed file
    let s = m
        .apply_transition_at(&s, ReviewField::ApprovedFile, FieldValue::File(Some("sig.pdf".to_string())), &approver(), None, t0())
        .unwrap();
    assert_eq!(s.approved_file.as_ref().map(|f| f.name.as_str()), Some("sig.pdf"));

    // (e) final approval succeeds and stamps the date
    let decided_at = t0() + Duration::hours(2);
    let s = m
        .apply_transition_at(&s, ReviewField::FinalStatus, status(ReviewStatus::Approved), &approver(), None, decided_at)
        .unwrap();
    assert!(s.final_status.is_approved());
    assert_eq!(s.final_approved_date(), Some(decided_at));

    // (f) the record is terminal: stage rejections no longer apply
    for (stage, actor) in [(Stage::Validator, validator()), (Stage::Recommender, recommender())] {
        let err = m
            .apply_transition_at(&s, ReviewField::Stage(stage), status(ReviewStatus::Rejected), &actor, Some("too late"), t0())
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidTransition { .. }));
    }
    let err = m
        .apply_transition_at(&s, ReviewField::FinalStatus, status(ReviewStatus::Rejected), &approver(), None, t0())
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidTransition { .. }));
}

#[test]
fn test_stage_rejection_requires_reason() {
    let m = machine();
    for comment in [None, Some(""), Some("   ")] {
        let err = m
            .apply_transition_at(&fresh("1"), ReviewField::Stage(Stage::Recommender), status(ReviewStatus::Rejected), &recommender(), comment, t0())
            .unwrap_err();
        assert_eq!(
            err,
            ApprovalError::MissingRejectionReason {
                stage: Stage::Recommender
            }
        );
    }

    let rejected = m
        .apply_transition_at(&fresh("1"), ReviewField::Stage(Stage::Recommender), status(ReviewStatus::Rejected), &recommender(), Some("  wrong cost centre "), t0())
        .unwrap();
    assert_eq!(
        rejected.recommender,
        StageState::Rejected {
            approver: RECOMMENDER.to_string(),
            date: t0(),
            comment: "wrong cost centre".to_string(),
        }
    );
    assert_eq!(rejected.rejection_remarks(), Some("wrong cost centre"));
}

#[test]
fn test_final_rejection_overrides_pending_stages() {
    let m = machine();
    let rejected = m
        .apply_transition_at(&fresh("1"), ReviewField::FinalStatus, status(ReviewStatus::Rejected), &approver(), None, t0())
        .unwrap();
    assert!(rejected.final_status.is_rejected());
    assert_eq!(rejected.final_rejected_date(), Some(t0()));
    assert!(rejected.validator.is_pending());
}

#[test]
fn test_final_approval_lists_every_gap() {
    let err = machine()
        .apply_transition_at(&fresh("1"), ReviewField::FinalStatus, status(ReviewStatus::Approved), &approver(), None, t0())
        .unwrap_err();
    assert_eq!(
        err,
        ApprovalError::PreconditionNotMet {
            missing: vec![
                MissingPrecondition::ValidatorApproval,
                MissingPrecondition::RecommenderApproval,
                MissingPrecondition::ApprovedFile,
            ]
        }
    );
    assert_eq!(
        err.to_string(),
        "Final approval requires validator approval, recommender approval, approved file"
    );
}
