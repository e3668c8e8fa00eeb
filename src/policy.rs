// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Content policy for finished summaries
//
// A summary goes to a patient. Runs once per completed session, after the
// terminal marker and before anything else sees the document. The default
// rule set scans for clinician-only section headings; a hit withholds the
// whole document.

use std::fmt;

use unicode_normalization::UnicodeNormalization;

use crate::config::{CompiledPattern, PolicyConfig};

// ---------------------------------------------------------------------------
// Interface and types
// ---------------------------------------------------------------------------

/// Decides whether a finished document may be released.
///
/// Implementations must be pure and deterministic: same input, same answer,
/// no side effects.
pub trait ContentValidator: Send + Sync {
    fn check(&self, document: &str) -> Result<(), PolicyViolation>;
}

/// Which kind of rule rejected a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    SectionMarker,
    Pattern,
}

/// Why a document was withheld. Names the rule, never the matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub kind: RuleKind,
    pub rule: String,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RuleKind::SectionMarker => write!(
                f,
                "summary withheld: it contains the clinician-only section \"{}\"",
                self.rule
            ),
            RuleKind::Pattern => write!(
                f,
                "summary withheld: it matches disallowed pattern \"{}\"",
                self.rule
            ),
        }
    }
}

/// A document that passed the content policy.
///
/// Only this crate can construct one, so email dispatch and export cannot
/// be handed partial or rejected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDocument(String);

impl ValidatedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accept/reject outcome for one finished document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ValidatedDocument),
    Rejected(PolicyViolation),
}

/// Run `validator` over a finished document and seal the result.
pub fn validate(validator: &dyn ContentValidator, document: String) -> Verdict {
    match validator.check(&document) {
        Ok(()) => Verdict::Accepted(ValidatedDocument(document)),
        Err(violation) => Verdict::Rejected(violation),
    }
}

// ---------------------------------------------------------------------------
// SectionMarkerValidator
// ---------------------------------------------------------------------------

/// Default [`ContentValidator`].
///
/// Two passes:
/// 1. Section markers: case-insensitive substring match on normalized text
/// 2. Patterns: compiled regex over the raw document
///
/// This is a heuristic. It catches a leaked clinician heading, not
/// clinician content written without one.
#[derive(Debug, Clone)]
pub struct SectionMarkerValidator {
    /// (as configured, normalized) pairs.
    markers: Vec<(String, String)>,
    patterns: Vec<CompiledPattern>,
}

impl SectionMarkerValidator {
    pub fn new(markers: Vec<String>, patterns: Vec<CompiledPattern>) -> Self {
        let markers = markers
            .into_iter()
            .map(|m| {
                let normalized = normalize_for_scan(&m);
                (m, normalized)
            })
            .filter(|(_, normalized)| !normalized.is_empty())
            .collect();
        Self { markers, patterns }
    }

    pub fn from_config(policy: &PolicyConfig) -> Self {
        Self::new(
            policy.disallowed_markers.clone(),
            policy.disallowed_patterns.clone(),
        )
    }
}

impl ContentValidator for SectionMarkerValidator {
    fn check(&self, document: &str) -> Result<(), PolicyViolation> {
        if !self.markers.is_empty() {
            let scanned = normalize_for_scan(document);
            if let Some((marker, _)) = self
                .markers
                .iter()
                .find(|(_, normalized)| scanned.contains(normalized.as_str()))
            {
                return Err(PolicyViolation {
                    kind: RuleKind::SectionMarker,
                    rule: marker.clone(),
                });
            }
        }

        if let Some(pattern) = self.patterns.iter().find(|p| p.find_in(document).is_some()) {
            return Err(PolicyViolation {
                kind: RuleKind::Pattern,
                rule: pattern.pattern.clone(),
            });
        }

        Ok(())
    }
}

/// NFKC, fold typographic apostrophes and quotes, lowercase, and collapse
/// whitespace runs (including newlines) to a single space.
fn normalize_for_scan(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.nfkc() {
        let ch = match ch {
            '\u{2018}' | '\u{2019}' | '\u{02bc}' | '\u{2032}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' => '-',
            other => other,
        };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(ch.to_lowercase());
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
