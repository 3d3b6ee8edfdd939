use chrono::{DateTime, Utc};
use tracing::debug;

use super::errors::{ApprovalError, MissingPrecondition};
use super::identity::ActorIdentity;
use super::policy::ReviewerPolicy;
use super::types::{
    ApprovedFile, FieldValue, FinalState, ReviewField, ReviewStatus, Stage, StageState,
    Submission,
};

/// Validates and applies reviewer transitions to submission records.
///
/// Every operation is synchronous and side-effect free: the input record is
/// never modified, the caller receives either the next record or the reason
/// the change was refused.
#[derive(Debug, Clone, Default)]
pub struct ApprovalMachine {
    policy: ReviewerPolicy,
}

impl ApprovalMachine {
    pub fn new(policy: ReviewerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ReviewerPolicy {
        &self.policy
    }

    /// Identity check only; record state is judged by `apply_transition`
    pub fn can_act_on(&self, actor: &ActorIdentity, field: ReviewField) -> bool {
        self.policy.permits(actor, field)
    }

    pub fn authorize(&self, actor: &ActorIdentity, field: ReviewField) -> Result<(), ApprovalError> {
        if self.can_act_on(actor, field) {
            Ok(())
        } else {
            Err(ApprovalError::Unauthorized {
                actor: actor.username.clone(),
                action: format!("change the {}", field),
            })
        }
    }

    pub fn apply_transition(
        &self,
        submission: &Submission,
        field: ReviewField,
        value: FieldValue,
        actor: &ActorIdentity,
        comment: Option<&str>,
    ) -> Result<Submission, ApprovalError> {
        self.apply_transition_at(submission, field, value, actor, comment, Utc::now())
    }

    /// Same as [`apply_transition`](Self::apply_transition) with an explicit clock
    pub fn apply_transition_at(
        &self,
        submission: &Submission,
        field: ReviewField,
        value: FieldValue,
        actor: &ActorIdentity,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Submission, ApprovalError> {
        self.authorize(actor, field)?;

        let mut next = submission.clone();
        match (field, &value) {
            (ReviewField::Stage(stage), FieldValue::Status(ReviewStatus::Approved)) => {
                ensure_stage_open(submission, stage, &value)?;
                *next.stage_mut(stage) = StageState::Approved {
                    approver: actor.username.clone(),
                    date: now,
                };
            }
            (ReviewField::Stage(stage), FieldValue::Status(ReviewStatus::Rejected)) => {
                let comment = comment
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or(ApprovalError::MissingRejectionReason { stage })?;
                ensure_stage_open(submission, stage, &value)?;
                *next.stage_mut(stage) = StageState::Rejected {
                    approver: actor.username.clone(),
                    date: now,
                    comment: comment.to_string(),
                };
            }
            (ReviewField::FinalStatus, FieldValue::Status(ReviewStatus::Approved)) => {
                ensure_final_open(submission, field, &value)?;
                let missing = missing_preconditions(submission);
                if !missing.is_empty() {
                    return Err(ApprovalError::PreconditionNotMet { missing });
                }
                next.final_status = FinalState::Approved {
                    approver: actor.username.clone(),
                    date: now,
                };
            }
            (ReviewField::FinalStatus, FieldValue::Status(ReviewStatus::Rejected)) => {
                // Approver override: stage outcomes are irrelevant here
                ensure_final_open(submission, field, &value)?;
                next.final_status = FinalState::Rejected {
                    approver: actor.username.clone(),
                    date: now,
                };
            }
            (ReviewField::ApprovedFile, FieldValue::File(Some(name))) => {
                ensure_final_open(submission, field, &value)?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(invalid(field, &value, "file name is empty"));
                }
                next.approved_file = Some(ApprovedFile {
                    name: name.to_string(),
                    uploaded_at: now,
                });
            }
            (ReviewField::ApprovedFile, FieldValue::File(None)) => {
                ensure_final_open(submission, field, &value)?;
                if submission.approved_file.is_none() {
                    return Err(invalid(field, &value, "no file is attached"));
                }
                next.approved_file = None;
            }
            _ => {
                return Err(invalid(field, &value, "transition is not defined"));
            }
        }

        next.updated_at = now;
        debug!(
            submission.id = %submission.id,
            actor = %actor.username,
            field = %field,
            value = %value,
            "Transition applied"
        );
        Ok(next)
    }
}

fn invalid(field: ReviewField, value: &FieldValue, reason: impl Into<String>) -> ApprovalError {
    ApprovalError::InvalidTransition {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn ensure_final_open(
    submission: &Submission,
    field: ReviewField,
    value: &FieldValue,
) -> Result<(), ApprovalError> {
    if submission.final_status.is_pending() {
        Ok(())
    } else {
        Err(invalid(
            field,
            value,
            format!("final status is already {}", submission.final_status.status()),
        ))
    }
}

fn ensure_stage_open(
    submission: &Submission,
    stage: Stage,
    value: &FieldValue,
) -> Result<(), ApprovalError> {
    let field = ReviewField::Stage(stage);
    ensure_final_open(submission, field, value)?;
    let current = submission.stage(stage);
    if current.is_pending() {
        Ok(())
    } else {
        Err(invalid(
            field,
            value,
            format!("{} stage is already {}", stage, current.status()),
        ))
    }
}

fn missing_preconditions(submission: &Submission) -> Vec<MissingPrecondition> {
    let mut missing = Vec::new();
    if !submission.validator.is_approved() {
        missing.push(MissingPrecondition::ValidatorApproval);
    }
    if !submission.recommender.is_approved() {
        missing.push(MissingPrecondition::RecommenderApproval);
    }
    if submission.approved_file.is_none() {
        missing.push(MissingPrecondition::ApprovedFile);
    }
    missing
}
