use std::fmt;
use thiserror::Error;

use super::types::{ReviewField, Stage, SubmissionId};

/// Precondition of final approval that was not satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPrecondition {
    ValidatorApproval,
    RecommenderApproval,
    ApprovedFile,
}

impl fmt::Display for MissingPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissingPrecondition::ValidatorApproval => "validator approval",
            MissingPrecondition::RecommenderApproval => "recommender approval",
            MissingPrecondition::ApprovedFile => "approved file",
        };
        f.write_str(label)
    }
}

fn join_missing(missing: &[MissingPrecondition]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validation failures surfaced to the reviewer. None of them are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("{actor} is not authorized to {action}")]
    Unauthorized { actor: String, action: String },

    #[error("Rejecting the {stage} stage requires a comment")]
    MissingRejectionReason { stage: Stage },

    #[error("Final approval requires {}", join_missing(.missing))]
    PreconditionNotMet { missing: Vec<MissingPrecondition> },

    #[error("Cannot set {field} to {value}: {reason}")]
    InvalidTransition {
        field: ReviewField,
        value: String,
        reason: String,
    },

    #[error("Submission {original} was already resubmitted as {existing}")]
    AlreadyResubmitted {
        original: SubmissionId,
        existing: SubmissionId,
    },

    #[error("Submission {id} has no rejection to resubmit")]
    NothingToResubmit { id: SubmissionId },
}
