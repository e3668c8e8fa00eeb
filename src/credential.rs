// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Bearer credentials
//
// Credentials are requested explicitly for every submission and every
// downstream action. Nothing here caches a token.

use std::fmt;

/// An opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Surrounding whitespace is dropped; an empty token
    /// is not a credential.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Source of bearer credentials (the identity provider seam).
///
/// Called synchronously right before a connection is opened. Returning
/// `None` means "not signed in" and aborts the submission.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

/// Reads the token from an environment variable on every call, so a token
/// rotated between submissions is picked up.
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn credential(&self) -> Option<Credential> {
        std::env::var(&self.var).ok().and_then(Credential::new)
    }
}

/// A fixed credential (or none). For embedders that obtain the token
/// elsewhere, and for tests.
pub struct StaticCredentialProvider(Option<Credential>);

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Credential::new(token))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credential(&self) -> Option<Credential> {
        self.0.clone()
    }
}
