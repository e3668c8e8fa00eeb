// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use super::defaults::{
    DEFAULT_EMAIL_PATH, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_SUMMARY_PATH,
    DEFAULT_TERMINAL_MARKER, DEFAULT_TOKEN_ENV,
};
use super::pattern::CompiledPattern;

/// Top-level parsed and validated healthletter config.
#[derive(Debug)]
pub struct Config {
    /// Contract version. Always "v1".
    pub version: String,
    pub endpoint: EndpointConfig,
    pub auth: AuthConfig,
    pub stream: StreamConfig,
    pub policy: PolicyConfig,
    /// Environment label (e.g. "staging", "production").
    pub environment: String,
    /// SHA256 of the raw YAML: "sha256:{hex}". Logged so operators can tell
    /// which policy a client ran with.
    pub policy_hash: String,
}

/// Where the summary generator and the email relay live.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Scheme and authority, without a trailing slash.
    pub base_url: String,
    pub summary_path: String,
    pub email_path: String,
    pub connect_timeout_ms: Option<u64>,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            summary_path: DEFAULT_SUMMARY_PATH.to_string(),
            email_path: DEFAULT_EMAIL_PATH.to_string(),
            connect_timeout_ms: None,
        }
    }

    pub fn summary_url(&self) -> String {
        format!("{}{}", self.base_url, self.summary_path)
    }

    pub fn email_url(&self) -> String {
        format!("{}{}", self.base_url, self.email_path)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

/// Where the bearer credential comes from.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Environment variable read fresh on every submission.
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

/// Streaming behaviour of a summary session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Payload the generator sends when no more fragments will arrive.
    pub terminal_marker: String,
    /// Longest silence tolerated between two events. `None` waits forever.
    pub idle_timeout_ms: Option<u64>,
    /// Upper bound on the accumulated document.
    pub max_document_bytes: usize,
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            terminal_marker: DEFAULT_TERMINAL_MARKER.to_string(),
            idle_timeout_ms: Some(DEFAULT_IDLE_TIMEOUT_MS),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

/// Content rules applied to every finished summary.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    /// Section markers that must never reach a patient, matched
    /// case-insensitively after normalization.
    pub disallowed_markers: Vec<String>,
    /// Regex rules compiled at load time.
    pub disallowed_patterns: Vec<CompiledPattern>,
}
