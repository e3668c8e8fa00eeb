// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// SSE decoding
//
// Turns a response body into classified stream events:
// - Lines end in LF, CRLF or CR; a CR at a chunk boundary is handled
// - Bytes are buffered until a full line is present, so multibyte UTF-8
//   split across network chunks survives intact
// - `data:` lines of one event are joined with '\n'; a blank line dispatches
// - Comments and `id:`/`retry:` fields are ignored
// - Neither an unterminated line nor an undispatched event may grow past
//   the byte limit

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::config::DEFAULT_MAX_DOCUMENT_BYTES;
use crate::transport::TransportError;

use super::gate::CompletionGate;
use super::types::{EventStream, SseFrame, StreamEvent};

/// Capacity of the channel between the body reader and the session.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Incremental SSE parser.
#[derive(Debug)]
pub struct SseDecoder {
    /// Bytes of the current, incomplete line.
    pending: Vec<u8>,
    /// The previous line ended in CR; a leading LF belongs to it.
    skip_lf: bool,
    event: Option<String>,
    data: Option<String>,
    limit: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_DOCUMENT_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder that refuses lines and events larger than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            skip_lf: false,
            event: None,
            data: None,
            limit,
        }
    }

    /// Feed a chunk of body bytes, returning every event it completes.
    ///
    /// Fails once a line or an event outgrows the limit; the decoder must
    /// not be fed again after that.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, TransportError> {
        let mut frames = Vec::new();
        let mut bytes = chunk;

        if self.skip_lf && !bytes.is_empty() {
            if bytes[0] == b'\n' {
                bytes = &bytes[1..];
            }
            self.skip_lf = false;
        }

        while let Some(pos) = bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
            self.pending.extend_from_slice(&bytes[..pos]);
            self.check_size(self.pending.len())?;
            let line = std::mem::take(&mut self.pending);

            let mut rest = &bytes[pos + 1..];
            if bytes[pos] == b'\r' {
                match rest.first() {
                    Some(b'\n') => rest = &rest[1..],
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }
            bytes = rest;

            if let Some(frame) = self.process_line(&String::from_utf8_lossy(&line))? {
                frames.push(frame);
            }
        }

        self.check_size(self.pending.len() + bytes.len())?;
        self.pending.extend_from_slice(bytes);
        Ok(frames)
    }

    /// Flush at end of body: an unterminated last line is processed and a
    /// pending event with data is dispatched.
    pub fn finish(&mut self) -> Result<Option<SseFrame>, TransportError> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            if let Some(frame) = self.process_line(&String::from_utf8_lossy(&line))? {
                return Ok(Some(frame));
            }
        }
        self.skip_lf = false;
        Ok(self.dispatch())
    }

    /// Bytes held for the current line and event.
    pub fn buffered_bytes(&self) -> usize {
        self.pending.len() + self.data.as_ref().map_or(0, String::len)
    }

    fn check_size(&self, held: usize) -> Result<(), TransportError> {
        if held > self.limit {
            return Err(TransportError::EventTooLarge { limit: self.limit });
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str) -> Result<Option<SseFrame>, TransportError> {
        if line.is_empty() {
            return Ok(self.dispatch());
        }

        // Comment line
        if line.starts_with(':') {
            return Ok(None);
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                let held = self.data.as_ref().map_or(0, |data| data.len() + 1);
                self.check_size(held + value.len())?;
                match self.data.as_mut() {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => self.data = Some(value.to_string()),
                }
            }
            "event" => self.event = Some(value.to_string()),
            // id, retry, and unknown fields carry nothing for us.
            _ => {}
        }
        Ok(None)
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        self.data.take().map(|data| SseFrame { event, data })
    }
}

/// Decode a response body into classified events.
///
/// Reading happens on a spawned task. When the consumer drops the returned
/// stream the task stops and drops `body`, which closes the connection.
/// The stream always ends with `ConnectionClosed` or `ConnectionError`
/// unless the consumer leaves first. A line or event larger than
/// `max_event_bytes` ends it with a `ConnectionError` and stops reading.
pub fn decode_event_stream<S>(body: S, gate: CompletionGate, max_event_bytes: usize) -> EventStream
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<StreamEvent>(EVENT_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::with_limit(max_event_bytes);

        loop {
            let next = tokio::select! {
                _ = tx.closed() => return, // Consumer gone
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => match decoder.push(&chunk) {
                    Ok(frames) => {
                        for frame in frames {
                            if tx.send(gate.classify(frame)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            buffered = decoder.buffered_bytes(),
                            error = %e,
                            "oversized server event"
                        );
                        let _ = tx.send(StreamEvent::ConnectionError(e)).await;
                        return;
                    }
                },
                Some(Err(e)) => {
                    let _ = tx.send(StreamEvent::ConnectionError(e)).await;
                    return;
                }
                None => {
                    match decoder.finish() {
                        Ok(Some(frame)) => {
                            if tx.send(gate.classify(frame)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = tx.send(StreamEvent::ConnectionError(e)).await;
                            return;
                        }
                    }
                    let _ = tx.send(StreamEvent::ConnectionClosed).await;
                    return;
                }
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}
