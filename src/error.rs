// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use crate::payload::PayloadError;
use crate::stream::StreamError;
use crate::transport::TransportError;

/// Why a submission did not produce a document.
///
/// A policy rejection is not an error: it is `Outcome::Rejected`. Neither is
/// cancellation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("not signed in: no credential available")]
    Authentication,

    #[error("incomplete visit record: {0}")]
    IncompletePayload(#[from] PayloadError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
