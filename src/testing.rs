// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Test doubles shared by the stream and controller tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::{default_disallowed_markers, StreamConfig};
use crate::credential::{Credential, CredentialProvider};
use crate::payload::RequestPayload;
use crate::policy::{ContentValidator, PolicyViolation, SectionMarkerValidator};
use crate::stream::{EventStream, SessionObserver, SessionUpdate, StreamEvent};
use crate::transport::{SummaryRequest, Transport, TransportError};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn jane_doe() -> RequestPayload {
    RequestPayload::new(
        "J. Doe",
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "Sore throat for three days, no fever. Advised rest and fluids.",
        "Dr. A",
        "Clinic X",
    )
}

pub fn summary_request() -> SummaryRequest {
    SummaryRequest {
        payload: jane_doe(),
        credential: Credential::new("test-token").unwrap(),
    }
}

pub fn fragments(texts: &[&str]) -> Vec<StreamEvent> {
    texts
        .iter()
        .map(|t| StreamEvent::Fragment(t.to_string()))
        .collect()
}

/// Stream config without an idle timeout, so paused-clock tests only time
/// out when they mean to.
pub fn stream_config() -> StreamConfig {
    StreamConfig {
        idle_timeout_ms: None,
        ..StreamConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// Replays a fixed list of events, then ends the stream.
pub struct ScriptedTransport {
    events: Vec<StreamEvent>,
    requests: Mutex<Vec<SummaryRequest>>,
}

impl ScriptedTransport {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn open_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SummaryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: SummaryRequest) -> Result<EventStream, TransportError> {
        self.requests.lock().unwrap().push(request);
        Ok(Box::pin(tokio_stream::iter(self.events.clone())))
    }
}

/// Hands out channel-backed streams, one per open, driven by the test.
pub struct ChannelTransport {
    streams: Mutex<VecDeque<mpsc::Receiver<StreamEvent>>>,
    opens: AtomicUsize,
}

impl ChannelTransport {
    /// A transport that can be opened `n` times, plus the sender for each
    /// stream in open order.
    pub fn with_streams(n: usize) -> (Self, Vec<mpsc::Sender<StreamEvent>>) {
        let mut senders = Vec::with_capacity(n);
        let mut streams = VecDeque::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = mpsc::channel(16);
            senders.push(tx);
            streams.push_back(rx);
        }
        let transport = Self {
            streams: Mutex::new(streams),
            opens: AtomicUsize::new(0),
        };
        (transport, senders)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn open(&self, _request: SummaryRequest) -> Result<EventStream, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.streams.lock().unwrap().pop_front() {
            Some(rx) => Ok(Box::pin(ReceiverStream::new(rx))),
            None => Err(TransportError::Connect("no stream left".into())),
        }
    }
}

/// A connection that never opens.
pub struct PendingTransport;

#[async_trait]
impl Transport for PendingTransport {
    async fn open(&self, _request: SummaryRequest) -> Result<EventStream, TransportError> {
        std::future::pending().await
    }
}

/// A connection that is always refused.
pub struct FailingTransport(pub TransportError);

#[async_trait]
impl Transport for FailingTransport {
    async fn open(&self, _request: SummaryRequest) -> Result<EventStream, TransportError> {
        Err(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Observers, validators, credentials
// ---------------------------------------------------------------------------

/// Records every accepted update. Can be switched to refuse updates, the
/// way a cancelled controller link does.
#[derive(Default)]
pub struct RecordingObserver {
    updates: Mutex<Vec<SessionUpdate>>,
    refusing: AtomicBool,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refuse(&self) {
        self.refusing.store(true, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<SessionUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn partials(&self) -> Vec<String> {
        self.updates()
            .into_iter()
            .filter_map(|u| match u {
                SessionUpdate::Partial(doc) => Some(doc),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn publish(&self, update: SessionUpdate) -> bool {
        if self.refusing.load(Ordering::SeqCst) {
            return false;
        }
        self.updates.lock().unwrap().push(update);
        true
    }
}

/// The default marker validator, counting how often it runs.
pub struct CountingValidator {
    inner: SectionMarkerValidator,
    calls: AtomicUsize,
}

impl CountingValidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SectionMarkerValidator::new(default_disallowed_markers(), Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentValidator for CountingValidator {
    fn check(&self, document: &str) -> Result<(), PolicyViolation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.check(document)
    }
}

/// Hands out tokens from a list, one per call; `None` once exhausted.
pub struct CountingCredentialProvider {
    tokens: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl CountingCredentialProvider {
    pub fn new(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tokens: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for CountingCredentialProvider {
    fn credential(&self) -> Option<Credential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().pop_front().and_then(Credential::new)
    }
}
