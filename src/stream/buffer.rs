// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use crate::config::DEFAULT_MAX_DOCUMENT_BYTES;

use super::types::StreamError;

/// Accumulates streamed fragments into one document.
///
/// Append-only while a session is active. Fragments are kept in arrival
/// order, byte for byte: nothing is trimmed, merged or deduplicated.
#[derive(Debug, Clone)]
pub struct TokenBuffer {
    document: String,
    fragments: usize,
    limit: usize,
}

impl TokenBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            document: String::new(),
            fragments: 0,
            limit,
        }
    }

    /// Append a fragment to the end of the document.
    ///
    /// Returns an error, leaving the buffer untouched, if the document
    /// would exceed the byte limit.
    pub fn append(&mut self, fragment: &str) -> Result<(), StreamError> {
        if self.document.len() + fragment.len() > self.limit {
            return Err(StreamError::BufferOverflow { limit: self.limit });
        }
        self.document.push_str(fragment);
        self.fragments += 1;
        Ok(())
    }

    /// The document as accumulated so far.
    pub fn snapshot(&self) -> String {
        self.document.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.document
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Number of fragments appended since the last reset.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn reset(&mut self) {
        self.document.clear();
        self.fragments = 0;
    }

    /// Move the document out, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        self.fragments = 0;
        std::mem::take(&mut self.document)
    }
}

impl Default for TokenBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DOCUMENT_BYTES)
    }
}
