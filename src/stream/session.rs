// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream session
//
// One session per submission, run as a single task. Events are handled one
// at a time in arrival order. Every wait on the network is raced against
// the cancel signal, biased towards cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::error::SubmissionError;
use crate::policy::{self, ContentValidator, Verdict};
use crate::transport::{SummaryRequest, Transport, TransportError};

use super::buffer::TokenBuffer;
use super::gate::{CompletionGate, GateDecision};
use super::types::{
    CancelSignal, EventStream, Outcome, SessionObserver, SessionState, SessionUpdate, StreamEvent,
};

/// Drives one streamed request from open to a single terminal [`Outcome`].
///
/// Consumed by [`StreamSession::run`]; a session is never reused.
pub struct StreamSession {
    id: Uuid,
    state: SessionState,
    buffer: TokenBuffer,
    gate: CompletionGate,
    validator: Arc<dyn ContentValidator>,
    observer: Arc<dyn SessionObserver>,
    idle_timeout: Option<Duration>,
}

impl StreamSession {
    pub fn new(
        id: Uuid,
        config: &StreamConfig,
        validator: Arc<dyn ContentValidator>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            buffer: TokenBuffer::new(config.max_document_bytes),
            gate: CompletionGate::new(config.terminal_marker.clone()),
            validator,
            observer,
            idle_timeout: config.idle_timeout().filter(|d| !d.is_zero()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open the stream and consume it until a terminal outcome.
    ///
    /// The event stream (and with it the connection) is dropped before this
    /// returns, whatever the outcome.
    pub async fn run(
        mut self,
        transport: Arc<dyn Transport>,
        request: SummaryRequest,
        mut cancel: CancelSignal,
    ) -> Outcome {
        self.buffer.reset();
        tracing::debug!(session_id = %self.id, "opening summary stream");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.cancel(),
            opened = transport.open(request) => opened,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(e) => return self.fail(e.into()),
        };

        if !self.advance(SessionState::Streaming, SessionUpdate::Streaming) {
            return self.cancel();
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancel(),
                next = next_event(&mut events, self.idle_timeout) => next,
            };

            let event = match next {
                Some(event) => event,
                // The decoder reports closure itself; a bare end of stream
                // means the same thing.
                None => StreamEvent::ConnectionClosed,
            };

            match self.gate.admit(event) {
                GateDecision::Append(text) => {
                    if let Err(e) = self.buffer.append(&text) {
                        return self.fail(e.into());
                    }
                    if text.is_empty() {
                        continue;
                    }
                    let partial = SessionUpdate::Partial(self.buffer.snapshot());
                    if !self.observer.publish(partial) {
                        return self.cancel();
                    }
                }
                GateDecision::Finish => break,
                GateDecision::ClosedEarly => {
                    let fragments = self.buffer.fragment_count();
                    return self.fail(TransportError::ClosedBeforeTerminal { fragments }.into());
                }
                GateDecision::Error(e) => return self.fail(e.into()),
                GateDecision::Discard => {}
            }
        }

        // Terminal seen: nothing after it is read.
        drop(events);

        if !self.advance(SessionState::Finalizing, SessionUpdate::Finalizing) {
            return self.cancel();
        }

        let fragments = self.buffer.fragment_count();
        let document = self.buffer.take();
        let bytes = document.len();
        let outcome = match policy::validate(&*self.validator, document) {
            Verdict::Accepted(doc) => {
                tracing::info!(session_id = %self.id, fragments, bytes, "summary accepted");
                Outcome::Accepted(doc)
            }
            Verdict::Rejected(violation) => {
                tracing::warn!(
                    session_id = %self.id,
                    fragments,
                    bytes,
                    rule = %violation.rule,
                    "summary withheld by content policy"
                );
                Outcome::Rejected(violation)
            }
        };
        self.finish(outcome)
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal session transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(session_id = %self.id, from = %self.state, to = %next, "session transition");
        self.state = next;
    }

    /// Move to `next` and tell the observer. `false` if the observer
    /// refused the update.
    fn advance(&mut self, next: SessionState, update: SessionUpdate) -> bool {
        self.transition(next);
        self.observer.publish(update)
    }

    fn finish(mut self, outcome: Outcome) -> Outcome {
        self.transition(outcome.state());
        if self.observer.publish(SessionUpdate::Finished(outcome.clone())) {
            outcome
        } else {
            // Cancelled between the verdict and publication.
            self.state = SessionState::Cancelled;
            Outcome::Cancelled
        }
    }

    fn fail(mut self, error: SubmissionError) -> Outcome {
        tracing::warn!(
            session_id = %self.id,
            state = %self.state,
            fragments = self.buffer.fragment_count(),
            error = %error,
            "summary session failed"
        );
        self.buffer.reset();
        self.finish(Outcome::Failed(error))
    }

    fn cancel(mut self) -> Outcome {
        tracing::info!(session_id = %self.id, state = %self.state, "summary session cancelled");
        self.buffer.reset();
        self.transition(SessionState::Cancelled);
        // Usually refused: whoever cancelled has already recorded it.
        let _ = self
            .observer
            .publish(SessionUpdate::Finished(Outcome::Cancelled));
        Outcome::Cancelled
    }
}

/// Next event, or a timeout error dressed as a connection error once the
/// stream has been silent for `idle`.
async fn next_event(events: &mut EventStream, idle: Option<Duration>) -> Option<StreamEvent> {
    match idle {
        None => events.next().await,
        Some(idle) => match tokio::time::timeout(idle, events.next()).await {
            Ok(event) => event,
            Err(_) => Some(StreamEvent::ConnectionError(TransportError::Timeout(
                format!("no event for {} ms", idle.as_millis()),
            ))),
        },
    }
}
