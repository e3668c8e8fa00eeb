// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use super::defaults::{
    default_disallowed_markers, DEFAULT_EMAIL_PATH, DEFAULT_IDLE_TIMEOUT_MS,
    DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_SUMMARY_PATH, DEFAULT_TERMINAL_MARKER,
};
use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::pattern::CompiledPattern;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a healthletter config from the given source.
///
/// Steps:
/// 1. Read raw YAML from the source
/// 2. Compute the SHA256 policy hash
/// 3. Parse YAML into raw deserialization types
/// 4. Resolve `${VAR}` interpolation in the endpoint URL and environment
/// 5. Validate values and apply defaults
/// 6. Compile policy patterns
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let policy_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.healthletter != "v1" {
        return Err(ConfigError::UnsupportedVersion {
            found: raw.healthletter,
        });
    }

    let endpoint = build_endpoint_config(raw.endpoint)?;
    let auth = build_auth_config(raw.auth)?;
    let stream = build_stream_config(raw.stream)?;
    let policy = build_policy_config(raw.policy)?;
    let environment = match raw.environment {
        Some(env) => resolve_variables(&env)?,
        None => String::new(),
    };

    Ok(Config {
        version: raw.healthletter,
        endpoint,
        auth,
        stream,
        policy,
        environment,
        policy_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

fn build_endpoint_config(raw: raw::RawEndpointConfig) -> Result<EndpointConfig, ConfigError> {
    let base_url = resolve_variables(&raw.base_url)?;
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::invalid(
            "endpoint.base_url",
            format!("\"{base_url}\" must start with http:// or https://"),
        ));
    }

    let summary_path = validate_path(
        "endpoint.summary_path",
        raw.summary_path.unwrap_or_else(|| DEFAULT_SUMMARY_PATH.to_string()),
    )?;
    let email_path = validate_path(
        "endpoint.email_path",
        raw.email_path.unwrap_or_else(|| DEFAULT_EMAIL_PATH.to_string()),
    )?;

    if raw.connect_timeout_ms == Some(0) {
        return Err(ConfigError::invalid(
            "endpoint.connect_timeout_ms",
            "must be > 0 (omit it to use the client default)",
        ));
    }

    Ok(EndpointConfig {
        base_url,
        summary_path,
        email_path,
        connect_timeout_ms: raw.connect_timeout_ms,
    })
}

fn validate_path(field: &'static str, path: String) -> Result<String, ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::invalid(
            field,
            format!("\"{path}\" must start with '/'"),
        ));
    }
    Ok(path)
}

fn build_auth_config(raw: Option<raw::RawAuthConfig>) -> Result<AuthConfig, ConfigError> {
    let Some(raw) = raw else {
        return Ok(AuthConfig::default());
    };
    let token_env = raw.token_env.trim().to_string();
    if token_env.is_empty() {
        return Err(ConfigError::invalid("auth.token_env", "must not be empty"));
    }
    Ok(AuthConfig { token_env })
}

fn build_stream_config(raw: Option<raw::RawStreamConfig>) -> Result<StreamConfig, ConfigError> {
    let Some(raw) = raw else {
        return Ok(StreamConfig::default());
    };

    let terminal_marker = raw
        .terminal_marker
        .unwrap_or_else(|| DEFAULT_TERMINAL_MARKER.to_string());
    if terminal_marker.trim().is_empty() {
        return Err(ConfigError::invalid(
            "stream.terminal_marker",
            "must not be blank",
        ));
    }

    // 0 disables the idle timeout entirely.
    let idle_timeout_ms = match raw.idle_timeout_ms {
        Some(0) => None,
        Some(ms) => Some(ms),
        None => Some(DEFAULT_IDLE_TIMEOUT_MS),
    };

    let max_document_bytes = raw.max_document_bytes.unwrap_or(DEFAULT_MAX_DOCUMENT_BYTES);
    if max_document_bytes == 0 {
        return Err(ConfigError::invalid(
            "stream.max_document_bytes",
            "must be > 0",
        ));
    }

    Ok(StreamConfig {
        terminal_marker: terminal_marker.trim().to_string(),
        idle_timeout_ms,
        max_document_bytes,
    })
}

fn build_policy_config(raw: Option<raw::RawPolicyConfig>) -> Result<PolicyConfig, ConfigError> {
    let Some(raw) = raw else {
        return Ok(PolicyConfig {
            disallowed_markers: default_disallowed_markers(),
            disallowed_patterns: Vec::new(),
        });
    };

    // Defaults first, then user markers.
    let mut disallowed_markers = if raw.use_default_markers != Some(false) {
        default_disallowed_markers()
    } else {
        Vec::new()
    };
    for marker in raw.disallowed_markers {
        if marker.trim().is_empty() {
            return Err(ConfigError::invalid(
                "policy.disallowed_markers",
                "markers must not be blank",
            ));
        }
        if !disallowed_markers.contains(&marker) {
            disallowed_markers.push(marker);
        }
    }

    let disallowed_patterns = raw
        .disallowed_patterns
        .iter()
        .map(|p| CompiledPattern::compile(p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PolicyConfig {
        disallowed_markers,
        disallowed_patterns,
    })
}
