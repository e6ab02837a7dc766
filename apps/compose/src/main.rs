use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{
    load_settings, HttpMailApi, Locale, Severity, SendWorkflow, WorkflowEvent, WorkflowOptions,
};
use shared::domain::{EmailId, MailboxAddress};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Compose and send one email through the mail backend, showing the remaining quota.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to ./mailer.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    locale: Option<Locale>,
    /// Mailbox/thread id the backend sends from.
    #[arg(long)]
    email_id: String,
    #[arg(long)]
    from: String,
    #[arg(long, default_value = "")]
    to: String,
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long, default_value = "")]
    body: String,
    /// Only print the current quota.
    #[arg(long)]
    quota_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(locale) = args.locale {
        settings.locale = locale;
    }
    debug!(server_url = %settings.server_url, locale = %settings.locale, "settings loaded");

    let api = Arc::new(HttpMailApi::from_settings(&settings)?);
    let workflow = SendWorkflow::new_with_services(
        EmailId(args.email_id),
        MailboxAddress(args.from),
        api.clone(),
        api,
        WorkflowOptions {
            locale: settings.locale,
            refresh_quota_on_open: settings.refresh_quota_on_open,
            on_send_success: None,
        },
    );
    let quota = workflow.activate().await;
    println!("from: {}", workflow.from_address());
    match quota.error_text() {
        Some(error) => println!("quota: {} ({error})", quota.display_text()),
        None => println!("quota: {}", quota.display_text()),
    }
    if args.quota_only {
        return Ok(());
    }

    let mut events = workflow.subscribe_events();
    workflow.open().await;
    workflow.set_to(args.to).await;
    workflow.set_subject(args.subject).await;
    workflow.set_body(args.body).await;

    let outcome = workflow.submit().await;
    drain_events(&mut events);

    if !outcome.is_sent() {
        bail!("email was not sent: {outcome:?}");
    }
    Ok(())
}

fn drain_events(events: &mut broadcast::Receiver<WorkflowEvent>) {
    loop {
        match events.try_recv() {
            Ok(WorkflowEvent::Notice(notice)) => match notice.severity {
                Severity::Success => println!("[{}] {}", notice.title, notice.description),
                Severity::Error => eprintln!("[{}] {}", notice.title, notice.description),
            },
            Ok(WorkflowEvent::QuotaUpdated(view)) => {
                println!("quota updated: {}", view.display_text())
            }
            Ok(WorkflowEvent::StateChanged(state)) => debug!(?state, "workflow state changed"),
            Ok(WorkflowEvent::DialogOpened | WorkflowEvent::DialogClosed) => {}
            Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "dropped workflow events"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
