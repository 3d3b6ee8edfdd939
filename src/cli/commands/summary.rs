use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use super::{report, CommandContext};
use crate::summary::{ImportedRow, SummaryProjection};

#[derive(Debug, Clone)]
pub enum SummaryAction {
    Sync,
    Export(Option<PathBuf>),
    Import(PathBuf),
    List(Option<String>),
}

pub struct SummaryCommand {
    pub action: SummaryAction,
}

impl SummaryCommand {
    pub fn new(action: SummaryAction) -> Self {
        Self { action }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let path = &ctx.summary_path;
        match &self.action {
            SummaryAction::Sync => {
                print!("🔄 Syncing approved requests into the summary table... ");
                std::io::Write::flush(&mut std::io::stdout())?;
                let added = ctx.service.sync_summary(path).await.map_err(report)?;
                println!("✅");
                println!("📊 {} new row(s) added", added);
            }
            SummaryAction::Export(output) => {
                let table = SummaryProjection::load(path).await?;
                match output {
                    Some(file) => {
                        let writer = BufWriter::new(
                            File::create(file).with_context(|| format!("Cannot create {}", file.display()))?,
                        );
                        table.export_json(writer)?;
                        println!("✅ Exported {} row(s) to {}", table.len(), file.display());
                    }
                    None => {
                        table.export_json(std::io::stdout().lock())?;
                        println!();
                    }
                }
            }
            SummaryAction::Import(input) => {
                let reader = BufReader::new(
                    File::open(input).with_context(|| format!("Cannot open {}", input.display()))?,
                );
                let rows: Vec<ImportedRow> = serde_json::from_reader(reader)
                    .with_context(|| format!("{} is not a JSON array of rows", input.display()))?;
                let imported =
                    SummaryProjection::update(path, move |table| Ok((table.import_rows(rows)?, true))).await?;
                println!("✅ Imported {} row(s); previous table replaced", imported);
            }
            SummaryAction::List(search) => {
                let table = SummaryProjection::load(path).await?;
                let rows = match search.as_deref() {
                    Some(term) => table.search(term),
                    None => table.rows().iter().collect(),
                };
                println!("📊 SUMMARY TABLE ({} of {} rows)", rows.len(), table.len());
                println!("────────────────────");
                for row in rows {
                    println!("   {} | {} | {}", row.id, row.company_list, row.security_group);
                }
            }
        }
        Ok(())
    }
}
