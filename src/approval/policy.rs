use serde::{Deserialize, Serialize};

use super::identity::{ActorIdentity, Role};
use super::types::{ReviewField, Stage};

/// Binds each review field to the identities allowed to write it.
///
/// Stage fields are bound to usernames (the reviewer on duty), final status
/// and the signed artifact are bound to roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerPolicy {
    /// Usernames on validator duty
    pub validator_identities: Vec<String>,
    /// Usernames allowed to record the recommendation
    pub recommender_identities: Vec<String>,
    /// Roles allowed to decide the final status and manage the approved file
    pub approver_roles: Vec<Role>,
}

impl Default for ReviewerPolicy {
    fn default() -> Self {
        Self {
            validator_identities: vec!["hod".to_string()],
            recommender_identities: vec!["recommender".to_string()],
            approver_roles: vec![Role::Admin, Role::SuperAdmin],
        }
    }
}

impl ReviewerPolicy {
    pub fn is_validator(&self, username: &str) -> bool {
        self.validator_identities.iter().any(|name| name == username)
    }

    pub fn is_recommender(&self, username: &str) -> bool {
        self.recommender_identities.iter().any(|name| name == username)
    }

    pub fn is_approver(&self, role: Role) -> bool {
        self.approver_roles.contains(&role)
    }

    pub fn permits(&self, actor: &ActorIdentity, field: ReviewField) -> bool {
        match field {
            ReviewField::Stage(Stage::Validator) => self.is_validator(&actor.username),
            ReviewField::Stage(Stage::Recommender) => self.is_recommender(&actor.username),
            ReviewField::FinalStatus | ReviewField::ApprovedFile => self.is_approver(actor.role),
        }
    }

    /// Fields the actor may write, in pipeline order
    pub fn fields_for(&self, actor: &ActorIdentity) -> Vec<ReviewField> {
        [
            ReviewField::Stage(Stage::Validator),
            ReviewField::Stage(Stage::Recommender),
            ReviewField::ApprovedFile,
            ReviewField::FinalStatus,
        ]
        .into_iter()
        .filter(|field| self.permits(actor, *field))
        .collect()
    }
}
