// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while loading and validating `healthletter.yaml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("config source {source_name} is empty")]
    EmptySource { source_name: String },

    #[error("failed to parse healthletter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config version \"{found}\", expected \"v1\"")]
    UnsupportedVersion { found: String },

    #[error("invalid value for `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("invalid policy pattern \"{pattern}\": {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("undefined variable ${{{name}}} in config (not set in environment)")]
    UndefinedVariable { name: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field,
            reason: reason.into(),
        }
    }
}
