// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Downstream actions on an accepted summary
//
// Both actions take a `ValidatedDocument`, so neither can be handed a
// partial or rejected document. A failed action leaves the accepted
// document intact and can be retried on its own.

mod email;
mod export;

pub use email::{
    EmailDispatcher, EmailReceipt, EmailRequest, HttpEmailDispatcher, DEFAULT_EMAIL_SUBJECT,
};
pub use export::{export_document, file_name, render, ExportFormat};

/// Errors from email dispatch and export.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("not signed in: no credential available")]
    Authentication,

    #[error("recipient address is not a valid email address")]
    InvalidRecipient,

    #[error("email request failed: {0}")]
    Request(String),

    #[error("email service answered with HTTP {status}")]
    Status { status: u16 },

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}
