// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

pub mod actions;
pub mod config;
pub mod controller;
pub mod credential;
pub mod error;
pub mod payload;
pub mod policy;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Submission, SubmissionController, SubmissionView};
pub use error::SubmissionError;
pub use payload::RequestPayload;
pub use stream::{Outcome, SessionState};
