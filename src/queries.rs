// Read-side views over the stored submissions
//
// Everything here borrows from a listing and never mutates it, so dashboards
// can call these repeatedly on the same snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::approval::{ReviewStatus, Stage, Submission};

/// Which stage rejections the holding area shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageFilter {
    #[default]
    All,
    Only(Stage),
}

impl StageFilter {
    fn matches(&self, submission: &Submission) -> bool {
        match self {
            StageFilter::All => submission.has_stage_rejection(),
            StageFilter::Only(stage) => submission.stage(*stage).is_rejected(),
        }
    }
}

/// Requests still moving through review: final Pending, no stage rejected
pub fn pending_queue(all: &[Submission]) -> Vec<&Submission> {
    all.iter()
        .filter(|s| s.final_status.is_pending() && !s.has_stage_rejection())
        .collect()
}

/// Requests whose final status matches, most recent decision first.
/// Pending requests keep storage order.
pub fn by_final_status(all: &[Submission], status: ReviewStatus) -> Vec<&Submission> {
    let mut matching: Vec<&Submission> = all
        .iter()
        .filter(|s| s.final_status.status() == status)
        .collect();
    if status != ReviewStatus::Pending {
        matching.sort_by(|a, b| decision_date(b).cmp(&decision_date(a)));
    }
    matching
}

fn decision_date(submission: &Submission) -> Option<DateTime<Utc>> {
    submission
        .final_approved_date()
        .or_else(|| submission.final_rejected_date())
}

pub fn by_username<'a>(all: &'a [Submission], username: &str) -> Vec<&'a Submission> {
    all.iter().filter(|s| s.username == username).collect()
}

/// Stage-rejected requests waiting on the applicant, latest rejection first
pub fn stage_rejected(all: &[Submission], filter: StageFilter) -> Vec<&Submission> {
    let mut rejected: Vec<&Submission> = all
        .iter()
        .filter(|s| s.final_status.is_pending() && filter.matches(s))
        .collect();
    rejected.sort_by(|a, b| b.latest_stage_rejection().cmp(&a.latest_stage_rejection()));
    rejected
}

/// Case-insensitive match on id, applicant, or any string in the request fields
pub fn search<'a>(all: &'a [Submission], term: &str) -> Vec<&'a Submission> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return all.iter().collect();
    }
    all.iter()
        .filter(|s| {
            s.id.as_str().to_lowercase().contains(&needle)
                || s.username.to_lowercase().contains(&needle)
                || s.fields.0.values().any(|value| value_contains(value, &needle))
        })
        .collect()
}

fn value_contains(value: &serde_json::Value, needle: &str) -> bool {
    match value {
        serde_json::Value::String(s) => s.to_lowercase().contains(needle),
        serde_json::Value::Array(items) => items.iter().any(|item| value_contains(item, needle)),
        serde_json::Value::Number(n) => n.to_string().contains(needle),
        _ => false,
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub in_review: usize,
    pub stage_rejected: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub fn counts(all: &[Submission]) -> StatusCounts {
    all.iter().fold(StatusCounts::default(), |mut acc, s| {
        acc.total += 1;
        match s.final_status.status() {
            ReviewStatus::Approved => acc.approved += 1,
            ReviewStatus::Rejected => acc.rejected += 1,
            ReviewStatus::Pending if s.has_stage_rejection() => acc.stage_rejected += 1,
            ReviewStatus::Pending => acc.in_review += 1,
        }
        acc
    })
}
