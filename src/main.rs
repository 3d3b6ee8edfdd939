use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use form_approval::cli::commands::list::{ListCommand, ShowCommand};
use form_approval::cli::commands::remove::RemoveCommand;
use form_approval::cli::commands::resubmit::ResubmitCommand;
use form_approval::cli::commands::review::{ReviewAction, ReviewCommand};
use form_approval::cli::commands::submit::SubmitCommand;
use form_approval::cli::commands::summary::{SummaryAction, SummaryCommand};
use form_approval::cli::commands::{show_how_to_get_work, CommandContext};
use form_approval::cli::{Cli, Commands, SummaryCommands};
use form_approval::config::FormApprovalConfig;
use form_approval::store::{JsonFileStore, SubmissionStore};
use form_approval::telemetry::{init_telemetry, shutdown_telemetry};
use form_approval::{ApprovalMachine, ReviewService};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = FormApprovalConfig::load_env_file() {
        eprintln!("⚠️  Ignoring unreadable .env file: {}", e);
    }
    let config = match &cli.config {
        Some(path) => FormApprovalConfig::load_from(path)?,
        None => form_approval::config()?.clone(),
    };
    init_telemetry(&config.observability)?;

    let result = tokio::runtime::Runtime::new()?.block_on(async { run(cli, config).await });

    shutdown_telemetry();
    result
}

async fn run(cli: Cli, config: FormApprovalConfig) -> Result<()> {
    let Some(command) = cli.command else {
        return show_how_to_get_work().await;
    };

    let store = open_store(&config).await?;
    let ctx = CommandContext {
        service: ReviewService::new(store, ApprovalMachine::new(config.reviewers.clone())),
        user: cli.user,
        role: cli.role,
        summary_path: config.storage.summary_path(),
    };

    match command {
        Commands::Submit { fields, field } => SubmitCommand::new(fields, field).execute(&ctx).await,
        Commands::Approve { id, stage } => {
            ReviewCommand::new(id, ReviewAction::Approve(stage.into()))
                .execute(&ctx)
                .await
        }
        Commands::Reject { id, stage, comment } => {
            ReviewCommand::new(
                id,
                ReviewAction::Reject {
                    stage: stage.into(),
                    comment,
                },
            )
            .execute(&ctx)
            .await
        }
        Commands::Attach { id, file } => {
            ReviewCommand::new(id, ReviewAction::Attach(file))
                .execute(&ctx)
                .await
        }
        Commands::Detach { id } => ReviewCommand::new(id, ReviewAction::Detach).execute(&ctx).await,
        Commands::Finalize { id, decision } => {
            ReviewCommand::new(id, ReviewAction::Finalize(decision.into()))
                .execute(&ctx)
                .await
        }
        Commands::Resubmit { id, fields, field } => {
            ResubmitCommand::new(id, fields, field).execute(&ctx).await
        }
        Commands::List { view, search } => ListCommand::new(view, search).execute(&ctx).await,
        Commands::Show { id } => ShowCommand::new(id).execute(&ctx).await,
        Commands::Remove { id } => RemoveCommand::new(id).execute(&ctx).await,
        Commands::Summary { command } => {
            let action = match command {
                SummaryCommands::Sync => SummaryAction::Sync,
                SummaryCommands::Export { output } => SummaryAction::Export(output),
                SummaryCommands::Import { input } => SummaryAction::Import(input),
                SummaryCommands::List { search } => SummaryAction::List(search),
            };
            SummaryCommand::new(action).execute(&ctx).await
        }
    }
}

#[cfg(feature = "database")]
async fn open_store(config: &FormApprovalConfig) -> Result<Arc<dyn SubmissionStore>> {
    use form_approval::store::SqliteSubmissionStore;

    if let Some(database) = &config.database {
        let store =
            SqliteSubmissionStore::connect(&database.url, database.max_connections, database.auto_migrate)
                .await?;
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(JsonFileStore::new(config.storage.submissions_path())))
}

#[cfg(not(feature = "database"))]
async fn open_store(config: &FormApprovalConfig) -> Result<Arc<dyn SubmissionStore>> {
    if config.database.is_some() {
        tracing::warn!("Database configured but the binary was built without the database feature");
    }
    Ok(Arc::new(JsonFileStore::new(config.storage.submissions_path())))
}
