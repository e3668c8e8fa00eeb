// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Visit record submitted for summarization.
//
// The form layer owns field-level UX; this type only guarantees that a
// session never opens with a blank required field.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One consultation to summarize.
///
/// Serialized with the field names the summary endpoint expects
/// (`date_of_visit` as `YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub patient_name: String,
    #[serde(rename = "date_of_visit")]
    pub visit_date: NaiveDate,
    pub notes: String,
    pub doctor_name: String,
    pub clinic_name: String,
}

/// A required field was blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("required field `{field}` is empty")]
pub struct PayloadError {
    pub field: &'static str,
}

impl RequestPayload {
    pub fn new(
        patient_name: impl Into<String>,
        visit_date: NaiveDate,
        notes: impl Into<String>,
        doctor_name: impl Into<String>,
        clinic_name: impl Into<String>,
    ) -> Self {
        Self {
            patient_name: patient_name.into(),
            visit_date,
            notes: notes.into(),
            doctor_name: doctor_name.into(),
            clinic_name: clinic_name.into(),
        }
    }

    /// Check that every text field has non-whitespace content.
    /// Reports the first blank field in declaration order.
    pub fn validate(&self) -> Result<(), PayloadError> {
        let fields = [
            ("patient_name", &self.patient_name),
            ("notes", &self.notes),
            ("doctor_name", &self.doctor_name),
            ("clinic_name", &self.clinic_name),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(PayloadError { field: *field }),
            None => Ok(()),
        }
    }
}
