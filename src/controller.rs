// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Submission controller
//
// Single entry point for "summarize this visit". Owns at most one active
// session, publishes a `SubmissionView` over a watch channel, and cancels
// the previous session before starting another.
//
// Cancellation is synchronous from the caller's point of view: each session
// publishes through a `SessionLink` whose cancelled flag is checked and
// set under one mutex, so once `cancel()` or `submit()` returns, nothing
// from the old session can reach the view.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{Config, StreamConfig};
use crate::credential::{CredentialProvider, EnvCredentialProvider};
use crate::error::SubmissionError;
use crate::payload::RequestPayload;
use crate::policy::{ContentValidator, SectionMarkerValidator};
use crate::stream::{
    CancelHandle, CancelSignal, Outcome, SessionObserver, SessionState, SessionUpdate,
    StreamSession,
};
use crate::transport::{HttpTransport, SummaryRequest, Transport};

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionView {
    /// The session this view describes; `None` before the first submission
    /// and after a refused one.
    pub session_id: Option<Uuid>,
    pub state: SessionState,
    /// The growing document while streaming, the accepted document once
    /// complete, empty otherwise.
    pub document: String,
    /// Set exactly once per session.
    pub outcome: Option<Outcome>,
}

impl SubmissionView {
    pub fn in_progress(&self) -> bool {
        self.session_id.is_some() && !self.state.is_terminal()
    }

    fn starting(session_id: Uuid) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    fn refused(error: SubmissionError) -> Self {
        Self {
            session_id: None,
            state: SessionState::Failed,
            document: String::new(),
            outcome: Some(Outcome::Failed(error)),
        }
    }

    fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Streaming => self.state = SessionState::Streaming,
            SessionUpdate::Partial(document) => self.document = document,
            SessionUpdate::Finalizing => self.state = SessionState::Finalizing,
            SessionUpdate::Finished(outcome) => {
                self.state = outcome.state();
                self.document = outcome
                    .document()
                    .map(|doc| doc.as_str().to_string())
                    .unwrap_or_default();
                self.outcome = Some(outcome);
            }
        }
    }
}

impl Default for SubmissionView {
    fn default() -> Self {
        Self {
            session_id: None,
            state: SessionState::Idle,
            document: String::new(),
            outcome: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session link: the per-session publication gate
// ---------------------------------------------------------------------------

struct SessionLink {
    session_id: Uuid,
    cancelled: Mutex<bool>,
    view: Arc<watch::Sender<SubmissionView>>,
}

impl SessionLink {
    fn new(session_id: Uuid, view: Arc<watch::Sender<SubmissionView>>) -> Self {
        Self {
            session_id,
            cancelled: Mutex::new(false),
            view,
        }
    }

    /// Close the gate and record the cancellation, unless the session
    /// already reached an outcome.
    fn cancel(&self) {
        let mut cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        if *cancelled {
            return;
        }
        *cancelled = true;
        self.view.send_if_modified(|view| {
            if view.session_id != Some(self.session_id) || view.outcome.is_some() {
                return false;
            }
            view.apply(SessionUpdate::Finished(Outcome::Cancelled));
            true
        });
    }
}

impl SessionObserver for SessionLink {
    fn publish(&self, update: SessionUpdate) -> bool {
        let cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        if *cancelled {
            return false;
        }
        self.view.send_if_modified(|view| {
            if view.session_id != Some(self.session_id) {
                return false;
            }
            view.apply(update);
            true
        });
        true
    }
}

struct ActiveSession {
    link: Arc<SessionLink>,
    cancel: CancelHandle,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct SubmissionController {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    validator: Arc<dyn ContentValidator>,
    stream_config: StreamConfig,
    view: Arc<watch::Sender<SubmissionView>>,
    active: Option<ActiveSession>,
}

impl SubmissionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        validator: Arc<dyn ContentValidator>,
        stream_config: StreamConfig,
    ) -> Self {
        let (view, _) = watch::channel(SubmissionView::default());
        Self {
            transport,
            credentials,
            validator,
            stream_config,
            view: Arc::new(view),
            active: None,
        }
    }

    /// Production wiring: HTTP transport, token from the configured
    /// environment variable, marker validator from the policy section.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            Arc::new(HttpTransport::from_config(config)?),
            Arc::new(EnvCredentialProvider::new(config.auth.token_env.clone())),
            Arc::new(SectionMarkerValidator::from_config(&config.policy)),
            config.stream.clone(),
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionView> {
        self.view.subscribe()
    }

    /// Point-in-time copy of the view.
    pub fn view(&self) -> SubmissionView {
        self.view.borrow().clone()
    }

    pub fn in_progress(&self) -> bool {
        self.view.borrow().in_progress()
    }

    /// Start summarizing `payload`, cancelling whatever was in flight.
    ///
    /// Refusals (blank field, no credential) are returned here and also
    /// published to the view; the transport is not touched. Must be called
    /// within a tokio runtime.
    pub fn submit(&mut self, payload: RequestPayload) -> Result<Submission, SubmissionError> {
        self.cancel();

        if let Err(e) = payload.validate() {
            return Err(self.refuse(e.into()));
        }
        let Some(credential) = self.credentials.credential() else {
            return Err(self.refuse(SubmissionError::Authentication));
        };

        let id = Uuid::new_v4();
        self.view.send_replace(SubmissionView::starting(id));

        let link = Arc::new(SessionLink::new(id, self.view.clone()));
        let (cancel, signal) = CancelSignal::pair();
        let session = StreamSession::new(
            id,
            &self.stream_config,
            self.validator.clone(),
            link.clone(),
        );
        let request = SummaryRequest {
            payload,
            credential,
        };

        tracing::info!(session_id = %id, "summary submitted");
        let task = tokio::spawn(session.run(self.transport.clone(), request, signal));
        self.active = Some(ActiveSession { link, cancel });

        Ok(Submission { id, task })
    }

    /// Abandon the active session, if any. Returns once no further update
    /// from it can reach the view; the connection closes shortly after.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(session_id = %active.link.session_id, "cancelling session");
            active.link.cancel();
            active.cancel.cancel();
        }
    }

    fn refuse(&self, error: SubmissionError) -> SubmissionError {
        tracing::warn!(error = %error, "submission refused");
        self.view.send_replace(SubmissionView::refused(error.clone()));
        error
    }
}

impl Drop for SubmissionController {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Submission handle
// ---------------------------------------------------------------------------

/// A started session. Dropping the handle does not cancel it; cancel
/// through the controller.
#[derive(Debug)]
pub struct Submission {
    id: Uuid,
    task: JoinHandle<Outcome>,
}

impl Submission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The session's single terminal outcome.
    pub async fn outcome(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Outcome::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
