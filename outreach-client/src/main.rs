//! `outreach` command-line driver.
//!
//! Each invocation runs one stage action against a persisted session and
//! prints the resulting view as JSON on stdout. Notifications go to stderr.

use clap::{Args, Parser, Subcommand};
use outreach_client::config::ClientConfig;
use outreach_client::error::ClientError;
use outreach_client::notifications::{NotificationAction, NotificationCenter};
use outreach_client::stages::{DraftBoard, Gate};
use outreach_client::{telemetry, UploadFile, WorkflowSession};
use outreach_core::{ContactId, EmailId};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "outreach", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "OUTREACH_CONFIG")]
    config: Option<PathBuf>,

    /// Session to resume; a new one is started when omitted
    #[arg(long, global = true, env = "OUTREACH_SESSION")]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Upload a contact file for preview
    Upload {
        file: PathBuf,

        #[arg(long, default_value = "")]
        campaign_name: String,

        #[arg(long, default_value = "")]
        product_name: String,

        #[arg(long, default_value = "")]
        product_description: String,
    },
    /// Show the uploaded rows awaiting confirmation
    Preview,
    /// Create the campaign from the uploaded rows
    Confirm,
    /// List the campaign's contacts
    Contacts,
    /// Generate sequence drafts, optionally for the given contacts only
    Generate { contact_ids: Vec<ContactId> },
    /// List sequence drafts
    Drafts,
    /// Edit and save a sequence draft
    Edit(DraftEdit),
    /// Send one sequence step
    Send { step_number: u32 },
    /// Show campaign counters
    Status,
    /// List reply drafts
    Replies,
    /// Edit a reply draft and mark it sent
    ReplySend(DraftEdit),
    /// End the session and discard its state
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
struct DraftEdit {
    email_id: EmailId,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    body: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    let config = ClientConfig::load_from(cli.config.clone())?;
    telemetry::init(&config.log_filter)?;

    let session_id = match cli.session.clone() {
        Some(id) => id,
        None => {
            let id = uuid::Uuid::now_v7().to_string();
            eprintln!("session: {}", id);
            id
        }
    };

    let session = WorkflowSession::init(&config, &session_id)?;
    let result = run(&session, cli.command).await;
    print_notifications(session.notifications());
    result
}

async fn run(session: &WorkflowSession, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Upload {
            file,
            campaign_name,
            product_name,
            product_description,
        } => {
            let mut stage = session.ingest();
            report_gate(&stage.enter());
            stage.set_campaign_name(&campaign_name);
            stage.set_product_name(&product_name);
            stage.set_product_description(&product_description);
            stage.select_file(UploadFile::from_path(&file).await?);
            stage.upload().await?;
            print_json(&stage.outcome())
        }
        Command::Preview => {
            let mut stage = session.preview();
            report_gate(&stage.enter());
            print_json(&serde_json::json!({
                "metadata": stage.metadata(),
                "rows": stage.rows(),
            }))
        }
        Command::Confirm => {
            let mut stage = session.preview();
            report_gate(&stage.enter());
            stage.confirm().await?;
            print_json(&stage.campaign())
        }
        Command::Contacts => {
            let mut stage = session.generate();
            report_gate(&stage.enter());
            stage.load().await?;
            print_json(&stage.contacts())
        }
        Command::Generate { contact_ids } => {
            let mut stage = session.generate();
            report_gate(&stage.enter());
            for id in contact_ids {
                stage.toggle_contact(id);
            }
            stage.generate().await?;
            print_json(&stage.board().drafts())
        }
        Command::Drafts => {
            let mut stage = session.generate();
            report_gate(&stage.enter());
            stage.load().await?;
            print_json(&stage.board().drafts())
        }
        Command::Edit(edit) => {
            let mut stage = session.generate();
            report_gate(&stage.enter());
            stage.load().await?;
            apply_edit(stage.board_mut(), &edit)?;
            stage.save().await?;
            print_json(&stage.board().selected())
        }
        Command::Send { step_number } => {
            let mut stage = session.send();
            report_gate(&stage.enter());
            stage.select_step(step_number)?;
            stage.send().await?;
            print_json(&stage.last_receipt())
        }
        Command::Status => {
            let mut stage = session.status();
            report_gate(&stage.enter());
            stage.refresh().await?;
            print_json(&stage.summary())
        }
        Command::Replies => {
            let mut stage = session.replies();
            report_gate(&stage.enter());
            stage.load().await?;
            print_json(&stage.board().drafts())
        }
        Command::ReplySend(edit) => {
            let mut stage = session.replies();
            report_gate(&stage.enter());
            stage.load().await?;
            apply_edit(stage.board_mut(), &edit)?;
            stage.mark_sent().await?;
            print_json(&stage.board().drafts())
        }
        Command::End => {
            let session_id = session.session_id().to_string();
            session.clone().teardown()?;
            print_json(&serde_json::json!({ "ended": session_id }))
        }
    }
}

fn apply_edit(board: &mut DraftBoard, edit: &DraftEdit) -> Result<(), ClientError> {
    board.select(edit.email_id)?;
    if let Some(subject) = &edit.subject {
        board.edit_subject(subject)?;
    }
    if let Some(body) = &edit.body {
        board.edit_body(body)?;
    }
    Ok(())
}

fn report_gate(gate: &Gate) {
    if let Gate::GoBack { to, reason } = gate {
        eprintln!("[blocked] {} (go back to {})", reason, to);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), ClientError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_notifications(center: &NotificationCenter) {
    for notification in center.drain() {
        let hint = match notification.action {
            Some(NotificationAction::GoBack(stage)) => format!(" (go back to {})", stage),
            Some(NotificationAction::Retry) => " (retry)".to_string(),
            Some(NotificationAction::Dismiss) | None => String::new(),
        };
        eprintln!("[{:?}] {}{}", notification.level, notification.message, hint);
    }
}
