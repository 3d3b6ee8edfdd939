use anyhow::Result;

use super::{print_submission, report, submission_id, CommandContext};
use crate::approval::{ReviewStatus, Stage};

/// One reviewer action on one request
#[derive(Debug, Clone)]
pub enum ReviewAction {
    Approve(Stage),
    Reject { stage: Stage, comment: String },
    Attach(String),
    Detach,
    Finalize(ReviewStatus),
}

pub struct ReviewCommand {
    pub id: String,
    pub action: ReviewAction,
}

impl ReviewCommand {
    pub fn new(id: impl Into<String>, action: ReviewAction) -> Self {
        Self {
            id: id.into(),
            action,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let actor = ctx.actor()?;
        let id = submission_id(&self.id);
        let service = &ctx.service;

        let result = match &self.action {
            ReviewAction::Approve(stage) => {
                println!("✅ Approving {} stage of {}...", stage, id);
                service.approve_stage(&id, *stage, &actor).await
            }
            ReviewAction::Reject { stage, comment } => {
                println!("⛔ Rejecting {} stage of {}...", stage, id);
                service.reject_stage(&id, *stage, &actor, comment).await
            }
            ReviewAction::Attach(name) => {
                println!("📎 Attaching '{}' to {}...", name, id);
                service.attach_file(&id, name, &actor).await
            }
            ReviewAction::Detach => {
                println!("📎 Removing approved file from {}...", id);
                service.detach_file(&id, &actor).await
            }
            ReviewAction::Finalize(status) => {
                println!("🏁 Recording final decision '{}' for {}...", status, id);
                service.decide_final(&id, *status, &actor).await
            }
        };

        let updated = result.map_err(report)?;
        println!();
        print_submission(&updated);
        Ok(())
    }
}
