use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::enums::DiagnosisSeverity;

/// One confidence factor a diagnosis rule declares.
///
/// Terms match a presenting symptom or a chronic condition; threshold
/// factors compare a numeric context attribute ("age>50").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfidenceFactor {
    Term(String),
    Threshold { attribute: String, min: f64 },
}

fn threshold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([a-z_]+)\s*>\s*(\d+(?:\.\d+)?)$").expect("valid regex"))
}

impl ConfidenceFactor {
    /// Parse a raw rule-table factor. Anything that is not a
    /// threshold expression is a plain term.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if let Some(caps) = threshold_pattern().captures(&lower) {
            if let Ok(min) = caps[2].parse::<f64>() {
                return Self::Threshold {
                    attribute: caps[1].to_string(),
                    min,
                };
            }
        }
        Self::Term(lower)
    }

    /// The factor as it appeared in the rule table, for evidence display.
    pub fn label(&self) -> String {
        match self {
            Self::Term(term) => term.clone(),
            Self::Threshold { attribute, min } => format!("{attribute}>{min}"),
        }
    }
}

/// One differential-diagnosis rule keyed by a presenting symptom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRule {
    pub presenting_symptom: String,
    pub diagnosis: String,
    pub factors: Vec<ConfidenceFactor>,
    pub severity: DiagnosisSeverity,
    pub next_steps: Vec<String>,
    pub citations: Vec<String>,
}

/// One medication option for a condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRule {
    pub condition: String,
    pub drug: String,
    pub drug_class: String,
    pub first_line: bool,
    pub benefits: Vec<String>,
    pub monitoring: Vec<String>,
    pub side_effects: Vec<String>,
    pub contraindications: Vec<String>,
    pub citations: Vec<String>,
}

/// A published clinical guideline summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guideline {
    pub topic: String,
    pub title: String,
    pub recommendation: String,
    pub source: String,
    pub url: String,
}

/// Immutable knowledge catalog, constructed once at startup and shared
/// read-only by the engine and its collaborators. Rule-table order is
/// preserved: it is the final tie-break for candidate ranking.
pub struct KnowledgeCatalog {
    diagnosis_rules: Vec<DiagnosisRule>,
    medication_rules: Vec<MedicationRule>,
    guidelines: Vec<Guideline>,
}

impl KnowledgeCatalog {
    /// Rules keyed by the given presenting symptom, in table order.
    pub fn rules_for_symptom<'a>(
        &'a self,
        symptom: &str,
    ) -> impl Iterator<Item = &'a DiagnosisRule> {
        let lower = symptom.to_lowercase();
        self.diagnosis_rules
            .iter()
            .filter(move |r| r.presenting_symptom == lower)
    }

    /// Medication options for a condition, in table order.
    pub fn medications_for_condition<'a>(
        &'a self,
        condition: &str,
    ) -> impl Iterator<Item = &'a MedicationRule> {
        let lower = condition.to_lowercase();
        self.medication_rules
            .iter()
            .filter(move |r| r.condition == lower)
    }

    pub fn guideline(&self, topic: &str) -> Option<&Guideline> {
        let lower = topic.to_lowercase();
        self.guidelines.iter().find(|g| g.topic == lower)
    }

    /// The curated bundled catalog.
    pub fn bundled() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let factors =
            |items: &[&str]| items.iter().map(|s| ConfidenceFactor::parse(s)).collect::<Vec<_>>();

        let diagnosis_rules = vec![
            DiagnosisRule {
                presenting_symptom: "chest_pain".into(),
                diagnosis: "Acute Coronary Syndrome".into(),
                factors: factors(&[
                    "chest_pain",
                    "dyspnea",
                    "diaphoresis",
                    "age>50",
                    "diabetes",
                    "hypertension",
                ]),
                severity: DiagnosisSeverity::Critical,
                next_steps: strings(&["ECG", "Troponin", "Cardiology consult"]),
                citations: strings(&["AHA/ACC Guidelines 2021", "PubMed: 33501848"]),
            },
            DiagnosisRule {
                presenting_symptom: "chest_pain".into(),
                diagnosis: "Gastroesophageal Reflux Disease".into(),
                factors: factors(&["chest_pain", "burning_sensation", "worse_after_meals"]),
                severity: DiagnosisSeverity::Low,
                next_steps: strings(&["Trial of PPI", "Lifestyle modifications"]),
                citations: strings(&["ACG Guidelines 2022"]),
            },
            DiagnosisRule {
                presenting_symptom: "chest_pain".into(),
                diagnosis: "Musculoskeletal Pain".into(),
                factors: factors(&["chest_pain", "tender_to_palpation", "recent_trauma"]),
                severity: DiagnosisSeverity::Low,
                next_steps: strings(&["NSAIDs", "Rest", "Physical therapy if persistent"]),
                citations: strings(&["UpToDate: Chest Wall Pain"]),
            },
            DiagnosisRule {
                presenting_symptom: "fever".into(),
                diagnosis: "Viral Upper Respiratory Infection".into(),
                factors: factors(&["fever", "cough", "rhinorrhea", "myalgia"]),
                severity: DiagnosisSeverity::Low,
                next_steps: strings(&["Symptomatic treatment", "Rest", "Hydration"]),
                citations: strings(&["CDC Guidelines"]),
            },
            DiagnosisRule {
                presenting_symptom: "fever".into(),
                diagnosis: "Bacterial Pneumonia".into(),
                factors: factors(&["fever", "productive_cough", "dyspnea", "chest_pain"]),
                severity: DiagnosisSeverity::High,
                next_steps: strings(&["Chest X-ray", "CBC", "Blood cultures", "Antibiotics"]),
                citations: strings(&["IDSA/ATS Guidelines 2019"]),
            },
            DiagnosisRule {
                presenting_symptom: "diabetes".into(),
                diagnosis: "Type 2 Diabetes Mellitus".into(),
                factors: factors(&[
                    "hyperglycemia",
                    "polyuria",
                    "polydipsia",
                    "obesity",
                    "family_history",
                ]),
                severity: DiagnosisSeverity::Moderate,
                next_steps: strings(&[
                    "HbA1c",
                    "Fasting glucose",
                    "Lipid panel",
                    "Renal function",
                ]),
                citations: strings(&["ADA Standards of Care 2024"]),
            },
        ];

        let medication_rules = vec![
            MedicationRule {
                condition: "diabetes".into(),
                drug: "Metformin".into(),
                drug_class: "Biguanide".into(),
                first_line: true,
                benefits: vec![],
                monitoring: strings(&["Renal function", "Vitamin B12"]),
                side_effects: vec![],
                contraindications: strings(&[
                    "renal_impairment",
                    "liver_disease",
                    "heart_failure",
                ]),
                citations: strings(&["ADA Guidelines 2024"]),
            },
            MedicationRule {
                condition: "diabetes".into(),
                drug: "Empagliflozin".into(),
                drug_class: "SGLT2 Inhibitor".into(),
                first_line: false,
                benefits: strings(&[
                    "Cardiovascular protection",
                    "Renal protection",
                    "Weight loss",
                ]),
                monitoring: strings(&["Renal function", "Genital infections"]),
                side_effects: vec![],
                contraindications: strings(&["eGFR<30"]),
                citations: strings(&["EMPA-REG OUTCOME Trial"]),
            },
            MedicationRule {
                condition: "hypertension".into(),
                drug: "Amlodipine".into(),
                drug_class: "Calcium Channel Blocker".into(),
                first_line: true,
                benefits: vec![],
                monitoring: strings(&["Blood pressure", "Heart rate"]),
                side_effects: strings(&["Peripheral edema", "Flushing"]),
                contraindications: strings(&["Severe aortic stenosis"]),
                citations: strings(&["JNC 8 Guidelines"]),
            },
            MedicationRule {
                condition: "hypertension".into(),
                drug: "Lisinopril".into(),
                drug_class: "ACE Inhibitor".into(),
                first_line: true,
                benefits: vec![],
                monitoring: strings(&["Renal function", "Potassium", "Blood pressure"]),
                side_effects: vec![],
                contraindications: strings(&[
                    "Pregnancy",
                    "Bilateral renal artery stenosis",
                    "Angioedema history",
                ]),
                citations: strings(&["ACC/AHA Guidelines 2017"]),
            },
            MedicationRule {
                condition: "infection".into(),
                drug: "Amoxicillin".into(),
                drug_class: "Penicillin".into(),
                first_line: true,
                benefits: strings(&["Respiratory infections", "UTI", "Otitis media"]),
                monitoring: vec![],
                side_effects: strings(&["Diarrhea", "Rash"]),
                contraindications: strings(&["Penicillin allergy"]),
                citations: strings(&["IDSA Guidelines"]),
            },
        ];

        let guidelines = vec![
            Guideline {
                topic: "diabetes_screening".into(),
                title: "Diabetes Screening Guidelines".into(),
                recommendation: "Screen adults >=35 years or those with risk factors".into(),
                source: "ADA 2024".into(),
                url: "https://diabetesjournals.org/care/issue/47/Supplement_1".into(),
            },
            Guideline {
                topic: "hypertension_management".into(),
                title: "Hypertension Management".into(),
                recommendation: "Target BP <130/80 for most adults".into(),
                source: "ACC/AHA 2017".into(),
                url: "https://www.ahajournals.org/guidelines".into(),
            },
        ];

        Self {
            diagnosis_rules,
            medication_rules,
            guidelines,
        }
    }
}
