// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Events delivered by a transport, session lifecycle states, outcomes,
// the observer seam, and stream-level errors.

use std::fmt;
use std::pin::Pin;

use tokio::sync::watch;
use tokio_stream::Stream;

use crate::error::SubmissionError;
use crate::policy::{PolicyViolation, ValidatedDocument};
use crate::transport::TransportError;

// ---------------------------------------------------------------------------
// SSE frame representation
// ---------------------------------------------------------------------------

/// One dispatched SSE event, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The `event:` field, if the server sent one.
    pub event: Option<String>,
    /// All `data:` lines of the event, joined with `\n`.
    pub data: String,
}

// ---------------------------------------------------------------------------
// Stream events
// ---------------------------------------------------------------------------

/// A classified event from the summary stream. Consumed exactly once by
/// the session that receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of generated text, to be appended verbatim.
    Fragment(String),
    /// The generator signalled that no more fragments will arrive.
    Terminal,
    /// The server closed the response.
    ConnectionClosed,
    /// The connection failed mid-stream.
    ConnectionError(TransportError),
}

/// Boxed stream of classified events, as returned by a transport.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of one streamed request.
///
/// ```text
/// Idle ──open──▶ Streaming ──terminal──▶ Finalizing ──verdict──▶ Completed
///   │               │  ▲ fragment            │
///   │               └──┘                     │
///   ├── open error / close / error ──────────┴──────────────────▶ Failed
///   └── cancel (from any non-terminal state) ───────────────────▶ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Streaming,
    Finalizing,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Streaming) => true,
            (Streaming, Streaming) => true,
            (Streaming, Finalizing) => true,
            (Finalizing, Completed) => true,
            (Idle | Streaming | Finalizing, Failed) => true,
            (Idle | Streaming | Finalizing, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Finalizing => "finalizing",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single terminal result of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Terminal marker received and the document passed the content policy.
    Accepted(ValidatedDocument),
    /// The generator finished but the document was withheld.
    Rejected(PolicyViolation),
    /// The session could not produce a complete document.
    Failed(SubmissionError),
    /// The session was abandoned. Not an error.
    Cancelled,
}

impl Outcome {
    /// The session state this outcome leaves behind. A rejected document
    /// still completed its session: the verdict is the result.
    pub fn state(&self) -> SessionState {
        match self {
            Outcome::Accepted(_) | Outcome::Rejected(_) => SessionState::Completed,
            Outcome::Failed(_) => SessionState::Failed,
            Outcome::Cancelled => SessionState::Cancelled,
        }
    }

    pub fn document(&self) -> Option<&ValidatedDocument> {
        match self {
            Outcome::Accepted(doc) => Some(doc),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Observer seam
// ---------------------------------------------------------------------------

/// A progress signal republished on every session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The connection is open.
    Streaming,
    /// The document so far, after a fragment was appended.
    Partial(String),
    /// Terminal marker seen; the document is being validated.
    Finalizing,
    /// The session ended.
    Finished(Outcome),
}

/// Receives session updates on behalf of the presentation layer.
///
/// `publish` returns `false` when the observer no longer accepts updates
/// from this session (it was cancelled); the session must then stop
/// without touching shared state again.
pub trait SessionObserver: Send + Sync {
    fn publish(&self, update: SessionUpdate) -> bool;
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Requests cancellation of one session. Dropping the handle cancels too.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// The session's side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(rx))
    }

    /// Resolves once cancellation is requested or the handle is gone.
    pub async fn cancelled(&mut self) {
        let _ = self.0.wait_for(|cancelled| *cancelled).await;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the stream machinery itself (as opposed to the network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The accumulated document would exceed the configured bound.
    #[error("summary exceeded {limit} byte limit")]
    BufferOverflow { limit: usize },
}
