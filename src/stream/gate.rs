// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Completion gate
//
// The generator ends a summary with a sentinel payload (`[DONE]` by
// default). The gate turns that sentinel into a structural
// `StreamEvent::Terminal`, keeps it out of the document, and latches shut
// so nothing after it is buffered.

use crate::config::DEFAULT_TERMINAL_MARKER;
use crate::transport::TransportError;

use super::types::{SseFrame, StreamEvent};

/// SSE event name that ends the stream regardless of its payload.
pub const TERMINAL_EVENT_NAME: &str = "done";

/// What the session should do with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Ordinary text: append it.
    Append(String),
    /// Terminal marker: stop reading and finalize.
    Finish,
    /// The stream ended without a terminal marker.
    ClosedEarly,
    /// The connection failed.
    Error(TransportError),
    /// The gate is already closed; drop the event.
    Discard,
}

#[derive(Debug, Clone)]
pub struct CompletionGate {
    marker: String,
    closed: bool,
}

impl CompletionGate {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().trim().to_string(),
            closed: false,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether a raw payload is the terminal sentinel.
    pub fn is_marker(&self, data: &str) -> bool {
        data.trim() == self.marker
    }

    /// Classify a decoded SSE frame into a stream event.
    pub fn classify(&self, frame: SseFrame) -> StreamEvent {
        if frame.event.as_deref() == Some(TERMINAL_EVENT_NAME) || self.is_marker(&frame.data) {
            StreamEvent::Terminal
        } else {
            StreamEvent::Fragment(frame.data)
        }
    }

    /// Decide what an incoming event means for the session.
    ///
    /// The first terminal (structural, or a fragment carrying the marker)
    /// closes the gate; every later event is discarded.
    pub fn admit(&mut self, event: StreamEvent) -> GateDecision {
        if self.closed {
            return GateDecision::Discard;
        }
        match event {
            StreamEvent::Fragment(text) if self.is_marker(&text) => {
                self.closed = true;
                GateDecision::Finish
            }
            StreamEvent::Fragment(text) => GateDecision::Append(text),
            StreamEvent::Terminal => {
                self.closed = true;
                GateDecision::Finish
            }
            StreamEvent::ConnectionClosed => {
                self.closed = true;
                GateDecision::ClosedEarly
            }
            StreamEvent::ConnectionError(e) => {
                self.closed = true;
                GateDecision::Error(e)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINAL_MARKER)
    }
}
