// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads healthletter.yaml, validates it, resolves variable interpolation,
// compiles policy patterns, and computes a deterministic policy hash.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod pattern;
mod raw;
mod source;
mod types;

pub use defaults::{
    default_disallowed_markers, DEFAULT_EMAIL_PATH, DEFAULT_IDLE_TIMEOUT_MS,
    DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_SUMMARY_PATH, DEFAULT_TERMINAL_MARKER, DEFAULT_TOKEN_ENV,
};
pub use error::ConfigError;
pub use interpolation::{resolve_variables, resolve_with};
pub use loader::{compute_hash, load_config};
pub use pattern::CompiledPattern;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{AuthConfig, Config, EndpointConfig, PolicyConfig, StreamConfig};
