//! Optional generative-text enrichment collaborator.
//!
//! The service sits behind the narrow [`Enrichment`] capability trait so
//! the deterministic core stays testable without network access. Every
//! response is an opaque annotation; the core never parses it as
//! structured data. Callers treat all errors as fail-open.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EnrichmentConfig;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Cannot reach enrichment service at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Enrichment service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Response parsing failed: {0}")]
    ResponseParsing(String),
}

/// Narrow capability interface for the external text service.
pub trait Enrichment: Send + Sync {
    /// Free-text commentary on a differential diagnosis.
    fn enhance_differential_diagnosis(
        &self,
        symptoms: &str,
        context_summary: &str,
    ) -> Result<String, EnrichmentError>;

    /// Short textual safety assessment for a proposed medication.
    fn medication_safety_text(
        &self,
        drug: &str,
        context_summary: &str,
    ) -> Result<String, EnrichmentError>;

    /// Prose treatment plan for a patient summary.
    fn treatment_plan_text(&self, patient_summary: &str) -> Result<String, EnrichmentError>;
}

const SYSTEM_PROMPT: &str = "You are a clinical decision support assistant. \
Respond with concise free text for a physician. Do not return structured data.";

/// HTTP implementation against a local or remote text-generation service.
pub struct HttpEnrichment {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpEnrichment {
    pub fn new(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnrichmentError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build from the environment; `None` means enrichment is disabled.
    pub fn from_env() -> Option<Self> {
        let config = EnrichmentConfig::from_env()?;
        match Self::new(&config) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::warn!(error = %e, "Enrichment client unavailable, disabling");
                None
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate(&self, prompt: &str) -> Result<String, EnrichmentError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system: SYSTEM_PROMPT,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                EnrichmentError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                EnrichmentError::Timeout(self.timeout_secs)
            } else {
                EnrichmentError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EnrichmentError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| EnrichmentError::ResponseParsing(e.to_string()))?;
        Ok(parsed.response)
    }
}

impl Enrichment for HttpEnrichment {
    fn enhance_differential_diagnosis(
        &self,
        symptoms: &str,
        context_summary: &str,
    ) -> Result<String, EnrichmentError> {
        let prompt = format!(
            "Provide a brief differential diagnosis commentary for this presentation.\n\
             Symptoms: {symptoms}\n\
             Patient context: {context_summary}\n\
             Highlight diagnoses that should not be missed and suggested workup."
        );
        self.generate(&prompt)
    }

    fn medication_safety_text(
        &self,
        drug: &str,
        context_summary: &str,
    ) -> Result<String, EnrichmentError> {
        let prompt = format!(
            "Assess the safety of prescribing {drug} for this patient.\n\
             Patient context: {context_summary}\n\
             Note interactions, contraindications and monitoring in a short paragraph."
        );
        self.generate(&prompt)
    }

    fn treatment_plan_text(&self, patient_summary: &str) -> Result<String, EnrichmentError> {
        let prompt = format!(
            "Generate a treatment plan for this patient with two sections, \
             PRESCRIPTION and CARE PLAN.\n\
             Patient summary: {patient_summary}\n\
             List medications with dose, frequency and duration, required tests, \
             lifestyle guidance, monitoring schedule and warning signs."
        );
        self.generate(&prompt)
    }
}

/// Mock enrichment for tests — returns a fixed response or a fixed error.
pub struct MockEnrichment {
    response: Result<String, ()>,
}

impl MockEnrichment {
    pub fn returning(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { response: Err(()) }
    }

    fn respond(&self) -> Result<String, EnrichmentError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(EnrichmentError::Connection("http://mock".into())),
        }
    }
}

impl Enrichment for MockEnrichment {
    fn enhance_differential_diagnosis(
        &self,
        _symptoms: &str,
        _context_summary: &str,
    ) -> Result<String, EnrichmentError> {
        self.respond()
    }

    fn medication_safety_text(
        &self,
        _drug: &str,
        _context_summary: &str,
    ) -> Result<String, EnrichmentError> {
        self.respond()
    }

    fn treatment_plan_text(&self, _patient_summary: &str) -> Result<String, EnrichmentError> {
        self.respond()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_text() {
        let mock = MockEnrichment::returning("consider troponin");
        assert_eq!(
            mock.enhance_differential_diagnosis("chest_pain", "age 58").unwrap(),
            "consider troponin"
        );
    }

    #[test]
    fn mock_failure_surfaces_error() {
        let mock = MockEnrichment::failing();
        assert!(mock.treatment_plan_text("summary").is_err());
    }

    #[test]
    fn http_client_builds_from_config() {
        let config = EnrichmentConfig {
            base_url: "http://localhost:11434/".into(),
            model: "medgemma:4b".into(),
            timeout_secs: 8,
        };
        let service = HttpEnrichment::new(&config).unwrap();
        assert_eq!(service.base_url(), "http://localhost:11434");
    }
}
