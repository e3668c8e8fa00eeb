// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Summary streaming
//
// Responsibilities:
// - Decode the SSE response body into fragment and terminal events
// - Recognize the terminal marker and keep it out of the document
// - Accumulate fragments in arrival order, memory-bounded
// - Drive one session from open to a single terminal outcome
// - Publish every transition to an observer, refusable after cancellation

mod buffer;
mod decoder;
mod gate;
mod session;
mod types;

pub use buffer::TokenBuffer;
pub use decoder::{decode_event_stream, SseDecoder};
pub use gate::{CompletionGate, GateDecision, TERMINAL_EVENT_NAME};
pub use session::StreamSession;
pub use types::{
    CancelHandle, CancelSignal, EventStream, Outcome, SessionObserver, SessionState, SessionUpdate,
    SseFrame, StreamError, StreamEvent,
};

#[cfg(test)]
mod tests;
