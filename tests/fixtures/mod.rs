/// Shared builders for the integration tests
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use form_approval::approval::{ActorIdentity, ReviewerPolicy, Role};
use form_approval::store::SubmissionStore;
use form_approval::{ApprovalMachine, RequestFields, ReviewService, Submission, SubmissionId};
use serde_json::json;

pub const VALIDATOR: &str = "siva";
pub const RECOMMENDER: &str = "gunaseelan";

/// Reviewer bindings used across the tests
#[allow(dead_code)]
pub fn policy() -> ReviewerPolicy {
    ReviewerPolicy {
        validator_identities: vec![VALIDATOR.to_string(), "hod".to_string()],
        recommender_identities: vec![RECOMMENDER.to_string()],
        approver_roles: vec![Role::Admin, Role::SuperAdmin],
    }
}

#[allow(dead_code)]
pub fn machine() -> ApprovalMachine {
    ApprovalMachine::new(policy())
}

#[allow(dead_code)]
pub fn service(store: Arc<dyn SubmissionStore>) -> ReviewService {
    ReviewService::new(store, machine())
}

#[allow(dead_code)]
pub fn validator() -> ActorIdentity {
    ActorIdentity::new(VALIDATOR, Role::Normal)
}

#[allow(dead_code)]
pub fn recommender() -> ActorIdentity {
    ActorIdentity::new(RECOMMENDER, Role::Normal)
}

#[allow(dead_code)]
pub fn approver() -> ActorIdentity {
    ActorIdentity::new("admin", Role::Admin)
}

#[allow(dead_code)]
pub fn applicant() -> ActorIdentity {
    ActorIdentity::new("alice", Role::Normal)
}

#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

/// A realistic access request payload
#[allow(dead_code)]
pub fn request_fields(fact_user_id: &str) -> RequestFields {
    RequestFields::new()
        .with("fullName", "Alice Example")
        .with("factUserId", fact_user_id)
        .with("entityName", json!(["Acme Ltd", "Globex"]))
        .with("securityGroupOther", "FIN-READ")
        .with("justification", "Quarter-end reporting")
}

#[allow(dead_code)]
pub fn fresh(id: &str) -> Submission {
    Submission::with_id(SubmissionId::from(id), "alice", request_fields("FU-1"), t0())
}
