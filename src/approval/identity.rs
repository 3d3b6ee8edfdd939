use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role '{0}' (expected Normal, Admin, SuperAdmin or Master)")]
pub struct ParseRoleError(pub String);

/// Role string handed over by the login collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Applicant filling in requests
    Normal,
    Admin,
    SuperAdmin,
    Master,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Normal => "Normal",
            Role::Admin => "Admin",
            Role::SuperAdmin => "SuperAdmin",
            Role::Master => "Master",
        };
        f.write_str(label)
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "user" => Ok(Role::Normal),
            "admin" => Ok(Role::Admin),
            "superadmin" | "super-admin" | "super_admin" => Ok(Role::SuperAdmin),
            "master" => Ok(Role::Master),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Authenticated caller as reported by the auth collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub username: String,
    pub role: Role,
}

impl ActorIdentity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

impl fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}
