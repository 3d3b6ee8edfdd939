use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::approval::{ReviewStatus, Role, Stage};

pub mod commands;

#[derive(Parser)]
#[command(name = "form-approval")]
#[command(about = "Multi-stage approval workflow for access request forms")]
#[command(long_about = "Form Approval moves access requests through validator and recommender review \
                       before an administrator records the final decision. Start with \
                       'form-approval submit' to file a request.")]
pub struct Cli {
    /// Configuration file to load instead of form-approval.toml
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    /// Acting username
    #[arg(long, short = 'u', global = true, help = "Username performing the action")]
    pub user: Option<String>,
    /// Acting role
    #[arg(long, global = true, default_value = "Normal", help = "Role: Normal, Admin, SuperAdmin, Master")]
    pub role: Role,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// File a new access request
    Submit {
        /// Whole request payload as a JSON object
        #[arg(long, help = "Request fields as a JSON object")]
        fields: Option<String>,
        /// Individual fields, repeatable
        #[arg(long = "field", short = 'f', value_name = "KEY=VALUE", help = "Set one request field (JSON values accepted)")]
        field: Vec<String>,
    },
    /// Approve a review stage
    Approve {
        id: String,
        #[arg(long, value_enum, help = "Stage to approve")]
        stage: StageArg,
    },
    /// Reject a review stage with a reason
    Reject {
        id: String,
        #[arg(long, value_enum, help = "Stage to reject")]
        stage: StageArg,
        #[arg(long, short = 'c', help = "Reason shown to the applicant")]
        comment: String,
    },
    /// Attach the signed approval document
    Attach {
        id: String,
        /// File name of the signed document
        file: String,
    },
    /// Remove the attached approval document
    Detach { id: String },
    /// Record the final decision
    Finalize {
        id: String,
        #[arg(value_enum, help = "approve or reject")]
        decision: DecisionArg,
    },
    /// Resubmit a rejected request
    Resubmit {
        id: String,
        #[arg(long, help = "Replacement fields as a JSON object (defaults to the current fields)")]
        fields: Option<String>,
        #[arg(long = "field", short = 'f', value_name = "KEY=VALUE", help = "Override one request field")]
        field: Vec<String>,
    },
    /// List requests
    List {
        #[arg(long, value_enum, default_value = "all", help = "Which requests to show")]
        view: ListView,
        #[arg(long, help = "Only requests matching this text")]
        search: Option<String>,
    },
    /// Show one request in detail
    Show { id: String },
    /// Delete a request (administrators only)
    Remove { id: String },
    /// Manage the summary table of approved grants
    Summary {
        #[command(subcommand)]
        command: SummaryCommands,
    },
}

#[derive(Subcommand)]
pub enum SummaryCommands {
    /// Add rows for newly approved requests
    Sync,
    /// Write the table as JSON rows
    Export {
        #[arg(long, short = 'o', help = "Output file (prints to stdout if not specified)")]
        output: Option<PathBuf>,
    },
    /// Replace the table from JSON rows
    Import {
        /// JSON file with ID / Company List / Security Group rows
        input: PathBuf,
    },
    /// Print the table
    List {
        #[arg(long, help = "Only rows matching this text")]
        search: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    Validator,
    Recommender,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Validator => Stage::Validator,
            StageArg::Recommender => Stage::Recommender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for ReviewStatus {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => ReviewStatus::Approved,
            DecisionArg::Reject => ReviewStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListView {
    All,
    Pending,
    StageRejected,
    Approved,
    Rejected,
    Mine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_requires_comment_flag() {
        let result = Cli::try_parse_from(["form-approval", "--user", "hod", "reject", "abc", "--stage", "validator"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_identity_flags_parse_roles() {
        let cli = Cli::try_parse_from([
            "form-approval",
            "finalize",
            "abc",
            "approve",
            "--user",
            "root",
            "--role",
            "super-admin",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("root"));
        assert_eq!(cli.role, Role::SuperAdmin);
        assert!(matches!(
            cli.command,
            Some(Commands::Finalize { decision: DecisionArg::Approve, .. })
        ));
    }

    #[test]
    fn test_list_view_defaults_to_all() {
        let cli = Cli::try_parse_from(["form-approval", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::List { view: ListView::All, search: None })
        ));
    }
}
