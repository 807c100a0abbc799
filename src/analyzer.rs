//! Patient context derivation over the external record store.
//!
//! Each sub-derivation is isolated: a failure in one (an unparseable
//! height, a missing birth date, a record query error) degrades to an
//! empty or default value and the rest of the context still assembles.
//! Clinical data completeness varies too much to do otherwise.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::CdsError;
use crate::models::enums::{ActiveField, ContextTrigger, RiskSeverity};
use crate::models::{
    Demographics, MedicalHistory, PatientContext, RiskFactor, SessionInput, StoredPatient, Vitals,
};
use crate::store::RecordStore;

/// How many recent record summaries a context carries.
const RECENT_RECORD_LIMIT: usize = 5;

pub struct ContextAnalyzer {
    records: Arc<dyn RecordStore>,
}

impl ContextAnalyzer {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Assemble the normalized clinical context for a patient.
    pub fn analyze(&self, patient_id: Uuid) -> Result<PatientContext, CdsError> {
        let patient = self
            .records
            .fetch_patient_profile(patient_id)?
            .ok_or(CdsError::PatientNotFound(patient_id))?;

        let demographics = derive_demographics(&patient);
        let vitals = derive_vitals(&patient);
        let history = MedicalHistory {
            chronic_conditions: patient.chronic_conditions.clone(),
            allergies: patient.allergies.clone(),
            family_history: patient.family_history.clone(),
        };
        let risk_factors = derive_risk_factors(&demographics, &vitals, &history);

        let recent_records = match self
            .records
            .fetch_recent_records(patient_id, RECENT_RECORD_LIMIT)
        {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(patient_id = %patient_id, error = %e, "Recent records unavailable, continuing without");
                Vec::new()
            }
        };

        let context = PatientContext {
            patient_id,
            demographics,
            vitals,
            history,
            current_medications: patient.current_medications,
            renal_function: patient.egfr,
            risk_factors,
            recent_records,
            generated_at: Utc::now(),
        };

        tracing::info!(
            patient_id = %patient_id,
            conditions = context.history.chronic_conditions.len(),
            risk_factors = context.risk_factors.len(),
            "Context analysis complete"
        );
        Ok(context)
    }

    /// Which generation stages a batch of session input should trigger.
    pub fn detect_context_changes(&self, session: &SessionInput) -> Vec<ContextTrigger> {
        let mut triggers = Vec::new();

        if !session.symptoms.is_empty() {
            triggers.push(ContextTrigger::NewSymptoms);
        }
        if !session.lab_results.is_empty() {
            triggers.push(ContextTrigger::NewLabResults);
        }
        if session.vitals.as_ref().is_some_and(|v| !v.is_empty()) {
            triggers.push(ContextTrigger::VitalSignsUpdated);
        }
        match session.active_field {
            Some(ActiveField::Diagnosis) => triggers.push(ContextTrigger::DiagnosisFieldActive),
            Some(ActiveField::Prescription) => {
                triggers.push(ContextTrigger::PrescriptionFieldActive)
            }
            None => {}
        }

        triggers
    }
}

fn derive_demographics(patient: &StoredPatient) -> Demographics {
    Demographics {
        age: patient
            .birth_date
            .map(|dob| whole_years_since(dob, Utc::now().date_naive())),
        gender: patient.gender.clone(),
        blood_group: patient.blood_group.clone(),
    }
}

/// Whole years elapsed between two dates.
fn whole_years_since(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    let birthday_passed = (today.month(), today.day()) >= (birth.month(), birth.day());
    if !birthday_passed {
        years -= 1;
    }
    years.max(0) as u32
}

fn derive_vitals(patient: &StoredPatient) -> Vitals {
    let height_cm = parse_positive(patient.height.as_deref(), "height");
    let weight_kg = parse_positive(patient.weight.as_deref(), "weight");

    let bmi = match (height_cm, weight_kg) {
        (Some(height), Some(weight)) => {
            let height_m = height / 100.0;
            Some(round2(weight / (height_m * height_m)))
        }
        _ => None,
    };

    Vitals {
        height_cm,
        weight_kg,
        bmi,
    }
}

/// Parse an upstream free-text measurement, degrading to None on garbage.
fn parse_positive(raw: Option<&str>, field: &str) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(value) if value > 0.0 => Some(value),
        Ok(_) => None,
        Err(_) => {
            tracing::warn!(field, value = text, "Unparseable measurement, skipping");
            None
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn derive_risk_factors(
    demographics: &Demographics,
    vitals: &Vitals,
    history: &MedicalHistory,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    if demographics.age.is_some_and(|age| age > 65) {
        factors.push(RiskFactor {
            factor: "Advanced Age".into(),
            severity: RiskSeverity::Moderate,
            description: "Increased risk for cardiovascular and metabolic conditions".into(),
        });
    }

    if let Some(bmi) = vitals.bmi {
        if bmi > 30.0 {
            factors.push(RiskFactor {
                factor: "Obesity".into(),
                severity: RiskSeverity::High,
                description: format!("BMI {bmi} indicates obesity, increased cardiovascular risk"),
            });
        } else if bmi > 25.0 {
            factors.push(RiskFactor {
                factor: "Overweight".into(),
                severity: RiskSeverity::Moderate,
                description: format!("BMI {bmi} indicates overweight status"),
            });
        }
    }

    let has = |name: &str| {
        history
            .chronic_conditions
            .iter()
            .any(|c| c.eq_ignore_ascii_case(name))
    };
    if has("Diabetes") {
        factors.push(RiskFactor {
            factor: "Diabetes".into(),
            severity: RiskSeverity::High,
            description: "Requires careful medication selection and monitoring".into(),
        });
    }
    if has("Hypertension") {
        factors.push(RiskFactor {
            factor: "Hypertension".into(),
            severity: RiskSeverity::High,
            description: "Cardiovascular risk factor, monitor BP regularly".into(),
        });
    }

    factors
}
