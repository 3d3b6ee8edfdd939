use chrono::{DateTime, Utc};
use tracing::info;

use super::errors::ApprovalError;
use super::identity::ActorIdentity;
use super::types::{RequestFields, Submission, SubmissionId};

/// Outcome of an applicant resubmitting a rejected request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resubmission {
    /// Stage-level rejection: the same record goes back into review
    ResetInPlace(Submission),
    /// Final rejection: the original is flagged and a linked record is opened
    Superseded {
        original: Submission,
        replacement: Submission,
    },
}

impl Resubmission {
    /// Record the applicant continues to track
    pub fn active(&self) -> &Submission {
        match self {
            Resubmission::ResetInPlace(submission) => submission,
            Resubmission::Superseded { replacement, .. } => replacement,
        }
    }

    pub fn is_new_record(&self) -> bool {
        matches!(self, Resubmission::Superseded { .. })
    }
}

pub fn find_resubmission<'a>(all: &'a [Submission], id: &SubmissionId) -> Option<&'a Submission> {
    all.iter()
        .find(|s| s.original_submission_id.as_ref() == Some(id))
}

pub fn has_resubmission(all: &[Submission], id: &SubmissionId) -> bool {
    find_resubmission(all, id).is_some()
}

/// Whether the applicant should be offered a resubmit action for `existing`
pub fn can_resubmit(existing: &Submission, all: &[Submission]) -> bool {
    if existing.final_status.is_rejected() {
        return existing.superseded_by.is_none() && !has_resubmission(all, &existing.id);
    }
    existing.final_status.is_pending() && existing.has_stage_rejection()
}

/// Decide what resubmitting `existing` with `fields` produces.
///
/// `all` is the full record list; it is only consulted to enforce the single
/// resubmission rule for final rejections.
pub fn resubmit(
    existing: &Submission,
    all: &[Submission],
    actor: &ActorIdentity,
    fields: RequestFields,
    now: DateTime<Utc>,
) -> Result<Resubmission, ApprovalError> {
    if actor.username != existing.username {
        return Err(ApprovalError::Unauthorized {
            actor: actor.username.clone(),
            action: format!("resubmit submission {}", existing.id),
        });
    }

    if existing.final_status.is_rejected() {
        if let Some(previous) = &existing.superseded_by {
            return Err(ApprovalError::AlreadyResubmitted {
                original: existing.id.clone(),
                existing: previous.clone(),
            });
        }
        if let Some(previous) = find_resubmission(all, &existing.id) {
            return Err(ApprovalError::AlreadyResubmitted {
                original: existing.id.clone(),
                existing: previous.id.clone(),
            });
        }

        let mut replacement = Submission::new(existing.username.clone(), fields, now);
        replacement.original_submission_id = Some(existing.id.clone());

        let mut original = existing.clone();
        original.resubmitted = true;
        original.resubmitted_at = Some(now);
        original.superseded_by = Some(replacement.id.clone());
        original.updated_at = now;

        info!(
            submission.id = %existing.id,
            replacement.id = %replacement.id,
            "Final rejection resubmitted as new request"
        );
        return Ok(Resubmission::Superseded {
            original,
            replacement,
        });
    }

    if existing.final_status.is_pending() && existing.has_stage_rejection() {
        let mut updated = existing.clone();
        updated.reset_reviews();
        updated.fields = fields;
        updated.resubmitted = true;
        updated.resubmitted_at = Some(now);
        updated.updated_at = now;

        info!(submission.id = %existing.id, "Stage rejection resubmitted in place");
        return Ok(Resubmission::ResetInPlace(updated));
    }

    Err(ApprovalError::NothingToResubmit {
        id: existing.id.clone(),
    })
}
