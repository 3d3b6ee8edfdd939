use anyhow::Result;
use std::collections::HashSet;

use super::{print_submission, print_summary_line, report, submission_id, CommandContext};
use crate::approval::{can_resubmit, find_resubmission, ReviewStatus, Submission, SubmissionId};
use crate::cli::ListView;
use crate::queries::{self, StageFilter};

pub struct ListCommand {
    pub view: ListView,
    pub search: Option<String>,
}

impl ListCommand {
    pub fn new(view: ListView, search: Option<String>) -> Self {
        Self { view, search }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let all = ctx.service.list().await.map_err(report)?;

        let selected: Vec<&Submission> = match self.view {
            ListView::All => all.iter().collect(),
            ListView::Pending => queries::pending_queue(&all),
            ListView::StageRejected => queries::stage_rejected(&all, StageFilter::All),
            ListView::Approved => queries::by_final_status(&all, ReviewStatus::Approved),
            ListView::Rejected => queries::by_final_status(&all, ReviewStatus::Rejected),
            ListView::Mine => queries::by_username(&all, &ctx.actor()?.username),
        };

        let selected: Vec<&Submission> = match self.search.as_deref() {
            Some(term) => {
                let hits: HashSet<&SubmissionId> =
                    queries::search(&all, term).into_iter().map(|s| &s.id).collect();
                selected.into_iter().filter(|s| hits.contains(&s.id)).collect()
            }
            None => selected,
        };

        let counts = queries::counts(&all);
        println!("📊 REQUESTS ({:?})", self.view);
        println!("────────────────────");
        println!(
            "   total {} | in review {} | stage rejected {} | approved {} | rejected {}",
            counts.total, counts.in_review, counts.stage_rejected, counts.approved, counts.rejected
        );
        println!();

        if selected.is_empty() {
            println!("📋 No matching requests");
            return Ok(());
        }

        for submission in selected {
            print_summary_line(submission);
            if submission.has_stage_rejection() {
                if let Some(remarks) = submission.rejection_remarks() {
                    println!("      💬 {}", remarks);
                }
            }
        }
        Ok(())
    }
}

pub struct ShowCommand {
    pub id: String,
}

impl ShowCommand {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let id = submission_id(&self.id);
        let all = ctx.service.list().await.map_err(report)?;
        let Some(submission) = all.iter().find(|s| s.id == id) else {
            println!("📋 No request with id {}", id);
            return Ok(());
        };

        print_submission(submission);
        if let Some(next) = find_resubmission(&all, &id) {
            println!("   🔗 Resubmitted as: {}", next.id);
        } else if can_resubmit(submission, &all) {
            println!();
            println!("💡 The applicant can resubmit: form-approval --user {} resubmit {}", submission.username, id);
        }
        Ok(())
    }
}
