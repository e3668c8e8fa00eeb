// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Kept apart from the public Config structs: interpolation and regex
// compilation happen between the two, and the public types hold `Regex`.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub healthletter: String,
    pub endpoint: RawEndpointConfig,
    pub auth: Option<RawAuthConfig>,
    pub stream: Option<RawStreamConfig>,
    pub policy: Option<RawPolicyConfig>,
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEndpointConfig {
    pub base_url: String,
    pub summary_path: Option<String>,
    pub email_path: Option<String>,
    pub connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAuthConfig {
    pub token_env: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStreamConfig {
    pub terminal_marker: Option<String>,
    pub idle_timeout_ms: Option<u64>,
    pub max_document_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicyConfig {
    /// If false, skip the built-in clinician-only markers. Default: true.
    pub use_default_markers: Option<bool>,
    #[serde(default)]
    pub disallowed_markers: Vec<String>,
    #[serde(default)]
    pub disallowed_patterns: Vec<String>,
}
