// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::payload::RequestPayload;
use crate::policy::ValidatedDocument;

use super::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "txt" | "text" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format: {other} (expected md or txt)")),
        }
    }
}

/// `consultation-summary-<patient-slug>-<visit-date>.<ext>`
pub fn file_name(visit: &RequestPayload, format: ExportFormat) -> String {
    format!(
        "consultation-summary-{}-{}.{}",
        slug(&visit.patient_name),
        visit.visit_date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Render the document with a metadata header.
pub fn render(document: &ValidatedDocument, visit: &RequestPayload, format: ExportFormat) -> String {
    let date = visit.visit_date.format("%Y-%m-%d");
    match format {
        ExportFormat::Markdown => format!(
            "# Consultation Summary\n\n\
             - **Patient:** {}\n\
             - **Date of visit:** {date}\n\
             - **Doctor:** {}\n\
             - **Clinic:** {}\n\n\
             ---\n\n\
             {}\n",
            visit.patient_name,
            visit.doctor_name,
            visit.clinic_name,
            document.as_str().trim_end()
        ),
        ExportFormat::Text => format!(
            "Consultation Summary\n\n\
             Patient: {}\n\
             Date of visit: {date}\n\
             Doctor: {}\n\
             Clinic: {}\n\n\
             {}\n",
            visit.patient_name,
            visit.doctor_name,
            visit.clinic_name,
            strip_markdown(document.as_str()).trim_end()
        ),
    }
}

/// Write the rendered document into `dir`, creating it if needed.
/// Returns the path written. An existing file of the same name is replaced.
pub async fn export_document(
    document: &ValidatedDocument,
    visit: &RequestPayload,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, ActionError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(visit, format));
    tokio::fs::write(&path, render(document, visit, format)).await?;
    tracing::info!(path = %path.display(), format = format.extension(), "summary exported");
    Ok(path)
}

/// Lowercase ASCII alphanumerics, everything else collapsed to '-'.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "patient".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drop heading hashes and emphasis markers. Bullets stay.
fn strip_markdown(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let unheaded = match trimmed.trim_start_matches('#') {
                rest if rest.len() < trimmed.len() && rest.starts_with(' ') => rest.trim_start(),
                _ => line,
            };
            unheaded.replace("**", "").replace("__", "")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
