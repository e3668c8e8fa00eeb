// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Resolves `${VAR_NAME}` references from the process environment.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    resolve_with(input, |name| std::env::var(name).ok())
}

/// Resolves `${VAR_NAME}` references through `lookup`.
///
/// A reference with no closing brace, or an empty name, is kept literally.
/// A well-formed reference that `lookup` cannot resolve is an error.
pub fn resolve_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        if !closed || name.is_empty() {
            result.push_str("${");
            result.push_str(&name);
            if closed {
                result.push('}');
            }
            continue;
        }

        let value = lookup(&name).ok_or(ConfigError::UndefinedVariable { name })?;
        result.push_str(&value);
    }

    Ok(result)
}
