use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use crate::approval::{
    ActorIdentity, RequestFields, ReviewStatus, Role, Stage, StageState, Submission, SubmissionId,
};
use crate::service::{ReviewService, ServiceError};

pub mod list;
pub mod remove;
pub mod resubmit;
pub mod review;
pub mod submit;
pub mod summary;

/// What every command needs: the service, who is acting and where the
/// summary table lives.
pub struct CommandContext {
    pub service: ReviewService,
    pub user: Option<String>,
    pub role: Role,
    pub summary_path: PathBuf,
}

impl CommandContext {
    /// Acting identity; commands that write require `--user`
    pub fn actor(&self) -> Result<ActorIdentity> {
        let username = self
            .user
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow!("This command needs an acting user: pass --user <name>"))?;
        Ok(ActorIdentity::new(username, self.role))
    }
}

/// Build request fields from an optional JSON object plus `KEY=VALUE` pairs.
/// Pair values are parsed as JSON when possible so lists can be passed.
pub fn parse_fields(base: Option<&str>, pairs: &[String]) -> Result<RequestFields> {
    let mut fields = match base {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).context("--fields is not valid JSON")?;
            RequestFields::from_value(value)
                .ok_or_else(|| anyhow!("--fields must be a JSON object"))?
        }
        None => RequestFields::new(),
    };

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Invalid field '{}': expected KEY=VALUE", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid field '{}': key is empty", pair);
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key, value);
    }
    Ok(fields)
}

/// Turn a service failure into the message shown to the reviewer
pub fn report(error: ServiceError) -> anyhow::Error {
    if error.is_validation() {
        println!("⛔ {}", error);
    } else if error.is_conflict() {
        println!("🔁 {}", error);
        println!("   💡 Someone else updated this request; run the command again");
    } else {
        println!("❌ {}", error);
    }
    error.into()
}

fn status_icon(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => "⏳",
        ReviewStatus::Approved => "✅",
        ReviewStatus::Rejected => "❌",
    }
}

pub fn print_summary_line(submission: &Submission) {
    println!(
        "{} {}  {}  validator:{} recommender:{} final:{}{}",
        status_icon(submission.final_status.status()),
        submission.id,
        submission.username,
        submission.validator.status(),
        submission.recommender.status(),
        submission.final_status.status(),
        if submission.resubmitted { "  🔄 resubmitted" } else { "" }
    );
}

pub fn print_submission(submission: &Submission) {
    println!("📋 Request {}", submission.id);
    println!("   👤 Applicant: {}", submission.username);
    println!("   🕒 Submitted: {}", submission.submitted_at.to_rfc3339());
    if let Some(original) = &submission.original_submission_id {
        println!("   🔗 Resubmission of: {}", original);
    }
    if let Some(replacement) = &submission.superseded_by {
        println!("   ➡️  Replaced by: {}", replacement);
    }
    for stage in Stage::ALL {
        print_stage(stage, submission.stage(stage));
    }
    match &submission.approved_file {
        Some(file) => println!("   📎 Approved file: {} ({})", file.name, file.uploaded_at.to_rfc3339()),
        None => println!("   📎 Approved file: none"),
    }
    let final_status = submission.final_status.status();
    match submission.final_status.approver() {
        Some(approver) => println!("   {} Final: {} by {}", status_icon(final_status), final_status, approver),
        None => println!("   {} Final: {}", status_icon(final_status), final_status),
    }
    if !submission.fields.is_empty() {
        println!("   📄 Fields:");
        for (key, value) in submission.fields.0.iter() {
            println!("      {}: {}", key, value);
        }
    }
}

fn print_stage(stage: Stage, state: &StageState) {
    let icon = status_icon(state.status());
    match state {
        StageState::Pending => println!("   {} {}: pending", icon, stage),
        StageState::Approved { approver, date } => {
            println!("   {} {}: approved by {} on {}", icon, stage, approver, date.to_rfc3339())
        }
        StageState::Rejected {
            approver,
            date,
            comment,
        } => println!(
            "   {} {}: rejected by {} on {}: {}",
            icon,
            stage,
            approver,
            date.to_rfc3339(),
            comment
        ),
    }
}

pub fn submission_id(raw: &str) -> SubmissionId {
    SubmissionId::from(raw.trim())
}

pub async fn show_how_to_get_work() -> Result<()> {
    println!("📝 Form Approval - access request review workflow");
    println!();
    println!("Applicants:");
    println!("  📨 form-approval --user <you> submit -f fullName=\"...\"   # File a request");
    println!("  🔄 form-approval --user <you> resubmit <id>              # Resubmit after rejection");
    println!();
    println!("Reviewers:");
    println!("  📋 form-approval list --view pending                      # Review queue");
    println!("  ✅ form-approval --user <you> approve <id> --stage validator");
    println!("  ⛔ form-approval --user <you> reject <id> --stage recommender -c \"reason\"");
    println!();
    println!("Administrators:");
    println!("  📎 form-approval --user <you> --role Admin attach <id> signed.pdf");
    println!("  🏁 form-approval --user <you> --role Admin finalize <id> approve");
    println!("  📊 form-approval summary sync");
    Ok(())
}
