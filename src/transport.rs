// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Summary transport
//
// Opens the streamed summary request and hands back classified events.
// The session only sees the `Transport` trait; `HttpTransport` is the
// reqwest implementation used in production.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::config::{Config, EndpointConfig, StreamConfig, DEFAULT_MAX_DOCUMENT_BYTES};
use crate::credential::Credential;
use crate::payload::RequestPayload;
use crate::stream::{decode_event_stream, CompletionGate, EventStream};

const EVENT_STREAM_MIME: &str = "text/event-stream";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Network-level failures. Messages carry no document text and no token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("could not reach the summary service: {0}")]
    Connect(String),

    #[error("summary service timed out: {0}")]
    Timeout(String),

    #[error("summary service answered with HTTP {status}")]
    Status { status: u16 },

    #[error("summary service did not answer with an event stream (content-type: {content_type})")]
    NotEventStream { content_type: String },

    #[error("summary stream interrupted: {0}")]
    Interrupted(String),

    #[error("summary stream closed before completion after {fragments} fragments")]
    ClosedBeforeTerminal { fragments: usize },

    #[error("summary service sent an event larger than {limit} bytes")]
    EventTooLarge { limit: usize },
}

impl TransportError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Connect(e.to_string())
        }
    }
}

/// Everything needed to open one summary stream.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub payload: RequestPayload,
    pub credential: Credential,
}

/// Opens a summary stream.
///
/// Implementations must be Send + Sync; sessions share one through `Arc`.
/// Dropping the returned stream must release the connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: SummaryRequest) -> Result<EventStream, TransportError>;
}

// ---------------------------------------------------------------------------
// Reqwest transport
// ---------------------------------------------------------------------------

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    gate: CompletionGate,
    max_event_bytes: usize,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>, gate: CompletionGate) -> Self {
        Self {
            client,
            url: url.into(),
            gate,
            max_event_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Cap on a single SSE line or event held while decoding.
    pub fn with_max_event_bytes(mut self, limit: usize) -> Self {
        self.max_event_bytes = limit;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::from_parts(&config.endpoint, &config.stream)
    }

    pub fn from_parts(
        endpoint: &EndpointConfig,
        stream: &StreamConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_client(endpoint)?,
            endpoint.summary_url(),
            CompletionGate::new(stream.terminal_marker.clone()),
        )
        .with_max_event_bytes(stream.max_document_bytes))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_event_bytes(&self) -> usize {
        self.max_event_bytes
    }
}

/// A reqwest client honouring the endpoint's connect timeout. There is no
/// whole-request timeout: streams are bounded by the session's idle timeout.
pub fn build_client(endpoint: &EndpointConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = endpoint.connect_timeout() {
        builder = builder.connect_timeout(timeout);
    }
    builder.build()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: SummaryRequest) -> Result<EventStream, TransportError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(request.credential.token())
            .header(ACCEPT, EVENT_STREAM_MIME)
            .json(&request.payload)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "summary request refused");
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_event_stream(&content_type) {
            return Err(TransportError::NotEventStream { content_type });
        }

        tracing::debug!(status = status.as_u16(), "summary stream open");

        let body = resp
            .bytes_stream()
            .map_err(|e| TransportError::Interrupted(e.to_string()));
        Ok(decode_event_stream(
            body,
            self.gate.clone(),
            self.max_event_bytes,
        ))
    }
}

/// `text/event-stream`, ignoring parameters and case.
fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case(EVENT_STREAM_MIME))
        .unwrap_or(false)
}
