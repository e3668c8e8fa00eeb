// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use healthletter::actions::{self, EmailDispatcher as _, ExportFormat, HttpEmailDispatcher};
use healthletter::config::{self, ConfigSource as _};
use healthletter::credential::EnvCredentialProvider;
use healthletter::policy::ValidatedDocument;
use healthletter::{Outcome, RequestPayload, SubmissionController, SubmissionView};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthletter", about = "Stream a patient-friendly consultation summary")]
struct Cli {
    /// Path to the healthletter.yaml config file
    #[arg(long, default_value = "healthletter.yaml", env = "HEALTHLETTER_CONFIG")]
    config: PathBuf,

    /// Patient name as it should appear in the greeting
    #[arg(long)]
    patient: String,

    /// Date of the visit (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// Treating doctor
    #[arg(long)]
    doctor: String,

    /// Clinic name
    #[arg(long)]
    clinic: String,

    /// Consultation notes, inline
    #[arg(long, conflicts_with = "notes_file", required_unless_present = "notes_file")]
    notes: Option<String>,

    /// Read consultation notes from a file
    #[arg(long)]
    notes_file: Option<PathBuf>,

    /// Write the accepted summary into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Export format: md or txt
    #[arg(long, default_value = "md")]
    format: ExportFormat,

    /// Email the accepted summary to this address
    #[arg(long)]
    email_to: Option<String>,

    /// Email subject
    #[arg(long)]
    subject: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("HEALTHLETTER_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let source = config::FileSource::new(&cli.config);
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        source = %source.describe(),
        version = %config.version,
        environment = %config.environment,
        endpoint = %config.endpoint.summary_url(),
        policy_hash = %config.policy_hash,
        "config loaded"
    );

    let notes = match &cli.notes_file {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(notes) => notes,
            Err(e) => {
                tracing::error!(path = %path.display(), "failed to read notes: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => cli.notes.clone().unwrap_or_default(),
    };
    let payload = RequestPayload::new(&cli.patient, cli.date, notes, &cli.doctor, &cli.clinic);

    let mut controller = match SubmissionController::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let printer = tokio::spawn(print_progress(controller.subscribe()));

    let submission = match controller.submit(payload.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("submission refused: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = tokio::select! {
        outcome = submission.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel();
            Outcome::Cancelled
        }
    };
    drop(controller);
    let _ = printer.await;

    match outcome {
        Outcome::Accepted(document) => {
            if run_actions(&cli, &config, &document, &payload).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Outcome::Rejected(violation) => {
            tracing::warn!(rule = %violation.rule, "{violation}");
            ExitCode::from(2)
        }
        Outcome::Failed(e) => {
            tracing::error!("summary failed: {e}");
            ExitCode::FAILURE
        }
        Outcome::Cancelled => {
            tracing::info!("summary cancelled");
            ExitCode::from(130)
        }
    }
}

/// Echo the growing document to stdout until the session ends.
async fn print_progress(mut views: watch::Receiver<SubmissionView>) {
    let mut printed = 0usize;
    let mut stdout = std::io::stdout();
    let mut outcome = None;
    loop {
        {
            let view = views.borrow_and_update();
            if view.document.len() > printed && view.document.is_char_boundary(printed) {
                let _ = stdout.write_all(view.document[printed..].as_bytes());
                let _ = stdout.flush();
                printed = view.document.len();
            }
            if view.outcome.is_some() {
                outcome = view.outcome.clone();
                break;
            }
        }
        if views.changed().await.is_err() {
            break;
        }
    }
    if printed > 0 {
        let _ = writeln!(stdout);
    }
    if let Some(notice) = outcome.as_ref().and_then(|o| retraction_notice(o, printed)) {
        eprintln!("{notice}");
    }
}

/// What to tell a terminal user whose screen already shows partial text
/// that was not released.
fn retraction_notice(outcome: &Outcome, printed: usize) -> Option<&'static str> {
    if printed == 0 {
        return None;
    }
    match outcome {
        Outcome::Accepted(_) => None,
        Outcome::Rejected(_) => {
            Some("WITHHELD: the summary failed the content check; the text above is not a released document")
        }
        Outcome::Failed(_) => {
            Some("INCOMPLETE: the summary did not finish; the text above is not a released document")
        }
        Outcome::Cancelled => {
            Some("CANCELLED: the text above is an unfinished draft, not a released document")
        }
    }
}

/// Export and email as requested. `false` if any action failed.
async fn run_actions(
    cli: &Cli,
    config: &config::Config,
    document: &ValidatedDocument,
    payload: &RequestPayload,
) -> bool {
    let mut ok = true;

    if let Some(dir) = &cli.export_dir {
        match actions::export_document(document, payload, cli.format, dir).await {
            Ok(path) => println!("saved to {}", path.display()),
            Err(e) => {
                tracing::error!("export failed: {e}");
                ok = false;
            }
        }
    }

    if let Some(to) = &cli.email_to {
        let credentials = Arc::new(EnvCredentialProvider::new(config.auth.token_env.clone()));
        let sent = match HttpEmailDispatcher::from_config(config, credentials) {
            Ok(dispatcher) => {
                match actions::EmailRequest::new(to, cli.subject.as_deref(), document, payload) {
                    Ok(request) => dispatcher.send(&request).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(actions::ActionError::Request(e.to_string())),
        };
        match sent {
            Ok(()) => println!("emailed to {to}"),
            Err(e) => {
                tracing::error!("email failed: {e}");
                ok = false;
            }
        }
    }

    ok
}
