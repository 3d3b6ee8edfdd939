// Core types for the submission review pipeline

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Opaque, immutable identifier of a submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Intermediate reviewer checkpoints a submission passes before final approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Department head / designated validator
    Validator,
    /// Designated recommender
    Recommender,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Validator, Stage::Recommender];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Validator => "validator",
            Stage::Recommender => "recommender",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown review status '{0}' (expected pending, approved or rejected)")]
pub struct ParseStatusError(pub String);

/// Flat status value as a reviewer would pick it from a dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReviewStatus::Pending => "Pending",
            ReviewStatus::Approved => "Approved",
            ReviewStatus::Rejected => "Rejected",
        };
        f.write_str(label)
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" | "approve" => Ok(ReviewStatus::Approved),
            "rejected" | "reject" => Ok(ReviewStatus::Rejected),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Decision recorded for one reviewer stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status")]
pub enum StageState {
    #[default]
    Pending,
    Approved {
        approver: String,
        date: DateTime<Utc>,
    },
    Rejected {
        approver: String,
        date: DateTime<Utc>,
        #[serde(deserialize_with = "non_blank_comment")]
        comment: String,
    },
}

// A stored rejection must carry the reason shown to the applicant
fn non_blank_comment<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let comment = String::deserialize(deserializer)?;
    if comment.trim().is_empty() {
        return Err(de::Error::custom("rejection comment must not be blank"));
    }
    Ok(comment)
}

impl StageState {
    pub fn status(&self) -> ReviewStatus {
        match self {
            StageState::Pending => ReviewStatus::Pending,
            StageState::Approved { .. } => ReviewStatus::Approved,
            StageState::Rejected { .. } => ReviewStatus::Rejected,
        }
    }

    pub fn approver(&self) -> Option<&str> {
        match self {
            StageState::Pending => None,
            StageState::Approved { approver, .. } | StageState::Rejected { approver, .. } => {
                Some(approver)
            }
        }
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self {
            StageState::Pending => None,
            StageState::Approved { date, .. } | StageState::Rejected { date, .. } => Some(*date),
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            StageState::Rejected { comment, .. } => Some(comment),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, StageState::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, StageState::Approved { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, StageState::Rejected { .. })
    }
}

/// Terminal decision gating downstream reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status")]
pub enum FinalState {
    #[default]
    Pending,
    Approved {
        approver: String,
        date: DateTime<Utc>,
    },
    Rejected {
        approver: String,
        date: DateTime<Utc>,
    },
}

impl FinalState {
    pub fn status(&self) -> ReviewStatus {
        match self {
            FinalState::Pending => ReviewStatus::Pending,
            FinalState::Approved { .. } => ReviewStatus::Approved,
            FinalState::Rejected { .. } => ReviewStatus::Rejected,
        }
    }

    pub fn approver(&self) -> Option<&str> {
        match self {
            FinalState::Pending => None,
            FinalState::Approved { approver, .. } | FinalState::Rejected { approver, .. } => {
                Some(approver)
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FinalState::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, FinalState::Approved { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, FinalState::Rejected { .. })
    }
}

/// Signed artifact uploaded by the final approver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedFile {
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Free-form request payload. The review pipeline never interprets it; the
/// summary projection reads a handful of well-known keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RequestFields(pub Map<String, Value>);

impl RequestFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; anything but an object is rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Trimmed string value, `None` when absent, blank or not a string
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// String entries of a list field. A plain string counts as one entry.
    pub fn entries(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Field a reviewer is trying to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewField {
    Stage(Stage),
    FinalStatus,
    ApprovedFile,
}

impl fmt::Display for ReviewField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewField::Stage(stage) => write!(f, "{} status", stage),
            ReviewField::FinalStatus => f.write_str("final status"),
            ReviewField::ApprovedFile => f.write_str("approved file"),
        }
    }
}

/// Value a reviewer wants to write into a [`ReviewField`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Status(ReviewStatus),
    File(Option<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Status(status) => write!(f, "{}", status),
            FieldValue::File(Some(name)) => write!(f, "file '{}'", name),
            FieldValue::File(None) => f.write_str("no file"),
        }
    }
}

/// One access request moving through the review pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub username: String,
    #[serde(default)]
    pub fields: RequestFields,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub validator: StageState,
    #[serde(default)]
    pub recommender: StageState,
    #[serde(default)]
    pub final_status: FinalState,
    #[serde(default)]
    pub approved_file: Option<ApprovedFile>,
    #[serde(default)]
    pub original_submission_id: Option<SubmissionId>,
    #[serde(default)]
    pub resubmitted: bool,
    #[serde(default)]
    pub resubmitted_at: Option<DateTime<Utc>>,
    /// Replacement opened after a final rejection; set on the original
    #[serde(default)]
    pub superseded_by: Option<SubmissionId>,
    /// Bumped by the persistence layer on every accepted write
    #[serde(default)]
    pub revision: u64,
}

impl Submission {
    pub fn new(username: impl Into<String>, fields: RequestFields, now: DateTime<Utc>) -> Self {
        Self::with_id(SubmissionId::generate(), username, fields, now)
    }

    pub fn with_id(
        id: SubmissionId,
        username: impl Into<String>,
        fields: RequestFields,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            fields,
            submitted_at: now,
            updated_at: now,
            validator: StageState::Pending,
            recommender: StageState::Pending,
            final_status: FinalState::Pending,
            approved_file: None,
            original_submission_id: None,
            resubmitted: false,
            resubmitted_at: None,
            superseded_by: None,
            revision: 0,
        }
    }

    pub fn stage(&self, stage: Stage) -> &StageState {
        match stage {
            Stage::Validator => &self.validator,
            Stage::Recommender => &self.recommender,
        }
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageState {
        match stage {
            Stage::Validator => &mut self.validator,
            Stage::Recommender => &mut self.recommender,
        }
    }

    pub fn stage_status(&self, stage: Stage) -> ReviewStatus {
        self.stage(stage).status()
    }

    pub fn both_stages_approved(&self) -> bool {
        self.validator.is_approved() && self.recommender.is_approved()
    }

    pub fn has_stage_rejection(&self) -> bool {
        self.validator.is_rejected() || self.recommender.is_rejected()
    }

    /// Every precondition for final approval holds
    pub fn ready_for_final_approval(&self) -> bool {
        self.both_stages_approved() && self.approved_file.is_some()
    }

    pub fn final_approved_date(&self) -> Option<DateTime<Utc>> {
        match &self.final_status {
            FinalState::Approved { date, .. } => Some(*date),
            _ => None,
        }
    }

    pub fn final_rejected_date(&self) -> Option<DateTime<Utc>> {
        match &self.final_status {
            FinalState::Rejected { date, .. } => Some(*date),
            _ => None,
        }
    }

    /// Most recent stage-level rejection, used to order the holding area
    pub fn latest_stage_rejection(&self) -> Option<DateTime<Utc>> {
        Stage::ALL
            .iter()
            .map(|stage| self.stage(*stage))
            .filter(|state| state.is_rejected())
            .filter_map(StageState::date)
            .max()
    }

    /// Reason shown to the applicant: validator comment wins over recommender
    pub fn rejection_remarks(&self) -> Option<&str> {
        self.validator.comment().or_else(|| self.recommender.comment())
    }

    pub(crate) fn reset_reviews(&mut self) {
        self.validator = StageState::Pending;
        self.recommender = StageState::Pending;
        self.final_status = FinalState::Pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_stage_state_serializes_with_status_tag() {
        let state = StageState::Rejected {
            approver: "hod".to_string(),
            date: at(9),
            comment: "missing manager sign-off".to_string(),
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "Rejected");
        assert_eq!(value["comment"], "missing manager sign-off");

        let pending = serde_json::to_value(StageState::Pending).unwrap();
        assert_eq!(pending, json!({ "status": "Pending" }));
    }

    #[test]
    fn test_rejected_stage_without_comment_does_not_deserialize() {
        let raw = json!({ "status": "Rejected", "approver": "hod", "date": "2024-03-01T09:00:00Z" });
        assert!(serde_json::from_value::<StageState>(raw).is_err());
    }

    #[test]
    fn test_rejected_stage_with_blank_comment_does_not_deserialize() {
        for comment in ["", "   "] {
            let raw = json!({
                "status": "Rejected",
                "approver": "hod",
                "date": "2024-03-01T09:00:00Z",
                "comment": comment,
            });
            let err = serde_json::from_value::<StageState>(raw).unwrap_err();
            assert!(err.to_string().contains("rejection comment must not be blank"));
        }

        let raw = json!({
            "status": "Rejected",
            "approver": "hod",
            "date": "2024-03-01T09:00:00Z",
            "comment": "wrong cost centre",
        });
        assert_eq!(
            serde_json::from_value::<StageState>(raw).unwrap().comment(),
            Some("wrong cost centre")
        );
    }

    #[test]
    fn test_submission_json_round_trip() {
        let mut submission = Submission::with_id(
            SubmissionId::from("1"),
            "alice",
            RequestFields::new()
                .with("factUserId", "FU-100")
                .with("entityName", json!(["North", "South"])),
            at(8),
        );
        submission.validator = StageState::Approved {
            approver: "hod".to_string(),
            date: at(9),
        };
        submission.approved_file = Some(ApprovedFile {
            name: "sig.pdf".to_string(),
            uploaded_at: at(10),
        });

        let encoded = serde_json::to_string(&submission).unwrap();
        let decoded: Submission = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, submission);
        assert!(encoded.contains("\"finalStatus\""));
        assert!(encoded.contains("\"approvedFile\""));
    }

    #[test]
    fn test_request_fields_accessors() {
        let fields = RequestFields::new()
            .with("factUserId", "  FU-7 ")
            .with("blank", "   ")
            .with("entityName", json!(["A", "", "B"]))
            .with("single", "Only");

        assert_eq!(fields.text("factUserId"), Some("FU-7"));
        assert_eq!(fields.text("blank"), None);
        assert_eq!(fields.entries("entityName"), vec!["A", "B"]);
        assert_eq!(fields.entries("single"), vec!["Only"]);
        assert!(fields.entries("missing").is_empty());
        assert!(RequestFields::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_review_status_parsing() {
        assert_eq!("approved".parse::<ReviewStatus>(), Ok(ReviewStatus::Approved));
        assert_eq!(" Reject ".parse::<ReviewStatus>(), Ok(ReviewStatus::Rejected));
        assert!("maybe".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn test_latest_stage_rejection_and_remarks() {
        let mut submission = Submission::new("bob", RequestFields::new(), at(7));
        assert_eq!(submission.latest_stage_rejection(), None);
        assert_eq!(submission.rejection_remarks(), None);

        submission.recommender = StageState::Rejected {
            approver: "rec".to_string(),
            date: at(11),
            comment: "wrong entity".to_string(),
        };
        submission.validator = StageState::Rejected {
            approver: "hod".to_string(),
            date: at(9),
            comment: "no justification".to_string(),
        };

        assert_eq!(submission.latest_stage_rejection(), Some(at(11)));
        assert_eq!(submission.rejection_remarks(), Some("no justification"));
    }
}
