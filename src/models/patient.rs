use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient row as the external record store hands it over.
///
/// Height and weight are free text because the upstream store does not
/// guarantee numeric types; BMI derivation parses and tolerates garbage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPatient {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    /// Height in cm, as recorded upstream.
    pub height: Option<String>,
    /// Weight in kg, as recorded upstream.
    pub weight: Option<String>,
    /// Estimated glomerular filtration rate, if a recent value exists.
    pub egfr: Option<f64>,
    pub chronic_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub family_history: Vec<String>,
    pub current_medications: Vec<String>,
}

/// Compact summary of a recently uploaded medical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub record_id: Uuid,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub description: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_patient_serializes() {
        let patient = StoredPatient {
            id: Uuid::new_v4(),
            name: "Ada Osei".into(),
            birth_date: NaiveDate::from_ymd_opt(1957, 3, 14),
            gender: Some("female".into()),
            blood_group: Some("O+".into()),
            height: Some("162".into()),
            weight: Some("71".into()),
            egfr: Some(58.0),
            chronic_conditions: vec!["Hypertension".into()],
            allergies: vec![],
            family_history: vec!["Diabetes".into()],
            current_medications: vec!["Amlodipine".into()],
        };
        let json = serde_json::to_string(&patient).unwrap();
        assert!(json.contains("Hypertension"));
        let back: StoredPatient = serde_json::from_str(&json).unwrap();
        assert_eq!(back.egfr, Some(58.0));
    }
}
