use anyhow::Result;

use super::{parse_fields, print_submission, report, CommandContext};

pub struct SubmitCommand {
    pub fields: Option<String>,
    pub pairs: Vec<String>,
}

impl SubmitCommand {
    pub fn new(fields: Option<String>, pairs: Vec<String>) -> Self {
        Self { fields, pairs }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let actor = ctx.actor()?;
        let fields = parse_fields(self.fields.as_deref(), &self.pairs)?;
        if fields.is_empty() {
            println!("⚠️  Submitting a request with no fields");
        }

        println!("📨 Filing request for {}...", actor.username);
        let submission = ctx.service.submit(&actor, fields).await.map_err(report)?;
        println!("✅ Request created");
        println!();
        print_submission(&submission);
        println!();
        println!("💡 Waiting on validator and recommender review");
        Ok(())
    }
}
