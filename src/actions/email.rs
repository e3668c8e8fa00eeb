// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::credential::CredentialProvider;
use crate::payload::RequestPayload;
use crate::policy::ValidatedDocument;
use crate::transport::build_client;

use super::ActionError;

pub const DEFAULT_EMAIL_SUBJECT: &str = "Consultation Summary";

/// Body of `POST /send-email`.
///
/// Fields are private: [`EmailRequest::new`] is the only way to build one,
/// and it takes the content from a [`ValidatedDocument`].
///
/// ```compile_fail
/// use healthletter::actions::EmailRequest;
///
/// let request = EmailRequest {
///     to_email: "jdoe@example.com".into(),
///     date_of_visit: chrono::NaiveDate::MIN,
///     subject: "Consultation Summary".into(),
///     content: "Summary of visit for the doctor's records".into(),
///     doctor_name: "Dr. A".into(),
///     clinic_name: "Clinic X".into(),
///     patient_name: "J. Doe".into(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRequest {
    to_email: String,
    date_of_visit: NaiveDate,
    subject: String,
    content: String,
    doctor_name: String,
    clinic_name: String,
    patient_name: String,
}

impl EmailRequest {
    /// Build an email for an accepted summary of `visit`.
    ///
    /// A blank subject falls back to [`DEFAULT_EMAIL_SUBJECT`].
    pub fn new(
        to_email: &str,
        subject: Option<&str>,
        document: &ValidatedDocument,
        visit: &RequestPayload,
    ) -> Result<Self, ActionError> {
        let to_email = to_email.trim();
        if !is_plausible_address(to_email) {
            return Err(ActionError::InvalidRecipient);
        }
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EMAIL_SUBJECT);

        Ok(Self {
            to_email: to_email.to_string(),
            date_of_visit: visit.visit_date,
            subject: subject.to_string(),
            content: document.as_str().to_string(),
            doctor_name: visit.doctor_name.clone(),
            clinic_name: visit.clinic_name.clone(),
            patient_name: visit.patient_name.clone(),
        })
    }

    pub fn to_email(&self) -> &str {
        &self.to_email
    }

    pub fn date_of_visit(&self) -> NaiveDate {
        self.date_of_visit
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The accepted summary text.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn doctor_name(&self) -> &str {
        &self.doctor_name
    }

    pub fn clinic_name(&self) -> &str {
        &self.clinic_name
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }
}

/// The relay's acknowledgement: `{"status": "...", "response": <code>}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailReceipt {
    pub status: String,
    /// Status code reported by the mail provider.
    pub response: u16,
}

/// Sends an accepted summary to the patient.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, ActionError>;
}

/// Posts to the summary service's email relay with a fresh credential.
pub struct HttpEmailDispatcher {
    client: reqwest::Client,
    url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpEmailDispatcher {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            credentials,
        }
    }

    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_client(&config.endpoint)?,
            config.endpoint.email_url(),
            credentials,
        ))
    }
}

#[async_trait]
impl EmailDispatcher for HttpEmailDispatcher {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, ActionError> {
        let credential = self
            .credentials
            .credential()
            .ok_or(ActionError::Authentication)?;

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(credential.token())
            .json(request)
            .send()
            .await
            .map_err(|e| ActionError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "email relay refused request");
            return Err(ActionError::Status {
                status: status.as_u16(),
            });
        }

        let receipt = resp
            .json::<EmailReceipt>()
            .await
            .map_err(|e| ActionError::Request(e.to_string()))?;
        tracing::info!(
            relay_status = %receipt.status,
            provider_code = receipt.response,
            "summary emailed"
        );
        Ok(receipt)
    }
}

/// One `@`, something on both sides, a dot in the domain, no whitespace.
fn is_plausible_address(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
