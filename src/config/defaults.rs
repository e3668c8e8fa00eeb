// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

pub const DEFAULT_SUMMARY_PATH: &str = "/api";
pub const DEFAULT_EMAIL_PATH: &str = "/send-email";
pub const DEFAULT_TOKEN_ENV: &str = "HEALTHLETTER_TOKEN";
pub const DEFAULT_TERMINAL_MARKER: &str = "[DONE]";
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 1_048_576; // 1 MB

/// The built-in disallowed markers, embedded at compile time.
const DEFAULT_MARKERS_YAML: &str = include_str!("default_markers.yaml");

#[derive(serde::Deserialize)]
struct DefaultMarkersYaml {
    disallowed_markers: Vec<String>,
}

/// Parse the embedded default markers.
/// Panics on malformed YAML (this is our own file).
pub fn default_disallowed_markers() -> Vec<String> {
    let raw: DefaultMarkersYaml =
        serde_yaml::from_str(DEFAULT_MARKERS_YAML).expect("default markers YAML is invalid");
    raw.disallowed_markers
}
