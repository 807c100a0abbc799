use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::RiskFactor;
use super::enums::{AlertKind, DiagnosisSeverity, EvidenceOrigin, PathwayKind, RiskSeverity, TriggerType};
use super::safety::{DrugDrugFinding, SafetyReport};

/// One matched confidence factor, tagged by where it matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub origin: EvidenceOrigin,
    pub factor: String,
}

/// A ranked differential-diagnosis candidate.
///
/// Confidence is deterministic for identical (symptoms, context) input,
/// in [0, 100] with one decimal. The AI annotation is opaque free text
/// appended after ranking; it never affects membership or order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub diagnosis: String,
    pub confidence: f64,
    pub severity: DiagnosisSeverity,
    pub supporting_evidence: Vec<Evidence>,
    pub next_steps: Vec<String>,
    pub citations: Vec<String>,
    pub ai_annotation: Option<String>,
}

/// A medication suggestion for a condition, pre-screened for
/// contraindications and annotated with interaction findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRecommendation {
    pub drug: String,
    pub drug_class: String,
    /// Condition the recommendation was generated for.
    pub condition: String,
    pub first_line: bool,
    pub benefits: Vec<String>,
    pub monitoring: Vec<String>,
    pub side_effects: Vec<String>,
    /// Drug-drug findings against the patient's current medications.
    pub interactions: Vec<DrugDrugFinding>,
    pub citations: Vec<String>,
    /// Set by preference filtering when the operator has accepted this
    /// (condition, drug) pair before.
    pub preferred: bool,
    pub preference_score: i64,
    /// Full safety report, attached by the engine.
    pub safety: Option<SafetyReport>,
}

/// One care-pathway step keyed off chronic conditions and risk factors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarePathwayStep {
    pub kind: PathwayKind,
    pub recommendation: String,
    pub frequency: Option<String>,
    pub urgency: Option<String>,
    pub rationale: String,
    pub citation: Option<String>,
}

/// A surfaced alert: high-severity risk, missing data, or preventive care.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalAlert {
    pub kind: AlertKind,
    pub severity: RiskSeverity,
    pub message: String,
    pub description: Option<String>,
    pub action_required: bool,
    pub suggested_action: Option<String>,
    pub citation: Option<String>,
}

/// Everything one analysis pass produced, handed to the calling layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionBundle {
    pub generated_at: DateTime<Utc>,
    pub patient_id: Uuid,
    pub trigger: TriggerType,
    pub differential_diagnosis: Vec<DiagnosisCandidate>,
    pub medication_recommendations: Vec<MedicationRecommendation>,
    pub care_pathway: Vec<CarePathwayStep>,
    pub alerts: Vec<CriticalAlert>,
    pub risk_factors: Vec<RiskFactor>,
}
