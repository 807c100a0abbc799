use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ActiveField, RiskSeverity};
use super::patient::RecordSummary;

/// Demographic slice of the clinical context.
/// Age is present only when a valid birth date exists upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Demographics {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
}

/// Vitals with derived body-mass index.
/// BMI is present only when both height and weight parse as positive numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vitals {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub bmi: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub chronic_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub family_history: Vec<String>,
}

/// One derived risk factor, ordered by derivation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub severity: RiskSeverity,
    pub description: String,
}

/// Normalized clinical context derived from the stored patient profile.
/// Transient: recomputed on every request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientContext {
    pub patient_id: Uuid,
    pub demographics: Demographics,
    pub vitals: Vitals,
    pub history: MedicalHistory,
    pub current_medications: Vec<String>,
    pub renal_function: Option<f64>,
    pub risk_factors: Vec<RiskFactor>,
    pub recent_records: Vec<RecordSummary>,
    pub generated_at: DateTime<Utc>,
}

impl PatientContext {
    /// Case-insensitive chronic-condition membership check.
    pub fn has_condition(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.history
            .chronic_conditions
            .iter()
            .any(|c| c.to_lowercase() == lower)
    }

    /// Short prose summary handed to the enrichment collaborator.
    /// Output is a prompt fragment, never parsed back.
    pub fn summary(&self) -> String {
        let age = self
            .demographics
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".into());
        let gender = self.demographics.gender.as_deref().unwrap_or("unknown");
        let list = |items: &[String]| {
            if items.is_empty() {
                "none".to_string()
            } else {
                items.join(", ")
            }
        };
        format!(
            "Age: {age}. Gender: {gender}. Chronic conditions: {}. Allergies: {}. Current medications: {}.",
            list(&self.history.chronic_conditions),
            list(&self.history.allergies),
            list(&self.current_medications),
        )
    }
}

/// Vitals captured live during the encounter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionVitals {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub spo2: Option<f64>,
}

impl SessionVitals {
    pub fn is_empty(&self) -> bool {
        self.blood_pressure.is_none()
            && self.heart_rate.is_none()
            && self.temperature.is_none()
            && self.spo2.is_none()
    }
}

/// Live in-session input merged over the stored context.
/// Session values override stored values, never vice versa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInput {
    pub symptoms: Vec<String>,
    pub diagnosis: Option<String>,
    pub lab_results: Vec<String>,
    pub vitals: Option<SessionVitals>,
    pub active_field: Option<ActiveField>,
}

/// The merged picture a single request reasons over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseContext {
    pub patient: PatientContext,
    pub symptoms: Vec<String>,
    pub working_diagnosis: Option<String>,
    pub session_vitals: Option<SessionVitals>,
}
