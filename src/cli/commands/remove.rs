use anyhow::Result;

use super::{report, submission_id, CommandContext};

pub struct RemoveCommand {
    pub id: String,
}

impl RemoveCommand {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let actor = ctx.actor()?;
        let id = submission_id(&self.id);

        if ctx.service.remove(&id, &actor).await.map_err(report)? {
            println!("🗑️  Removed request {}", id);
        } else {
            println!("📋 No request with id {}", id);
        }
        Ok(())
    }
}
