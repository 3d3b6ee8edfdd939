use anyhow::Result;

use super::{parse_fields, print_submission, report, submission_id, CommandContext};
use crate::approval::Resubmission;

pub struct ResubmitCommand {
    pub id: String,
    pub fields: Option<String>,
    pub pairs: Vec<String>,
}

impl ResubmitCommand {
    pub fn new(id: impl Into<String>, fields: Option<String>, pairs: Vec<String>) -> Self {
        Self {
            id: id.into(),
            fields,
            pairs,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let actor = ctx.actor()?;
        let id = submission_id(&self.id);

        // Without a replacement payload the current fields are edited in place
        let fields = if self.fields.is_some() {
            parse_fields(self.fields.as_deref(), &self.pairs)?
        } else {
            let mut current = ctx.service.get(&id).await.map_err(report)?.fields;
            for (key, value) in parse_fields(None, &self.pairs)?.0 {
                current.0.insert(key, value);
            }
            current
        };

        println!("🔄 Resubmitting {}...", id);
        match ctx.service.resubmit(&id, &actor, fields).await.map_err(report)? {
            Resubmission::ResetInPlace(updated) => {
                println!("✅ Request returned to review");
                println!();
                print_submission(&updated);
            }
            Resubmission::Superseded { replacement, .. } => {
                println!("✅ New request {} opened for the rejected {}", replacement.id, id);
                println!();
                print_submission(&replacement);
            }
        }
        Ok(())
    }
}
