use serde::{Deserialize, Serialize};

use super::enums::{AllergyMatchKind, InteractionSeverity, RenalAction};

/// Interaction between the proposed drug and one the patient already takes.
/// Lookups are symmetric: (A, B) and (B, A) resolve to the same entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugDrugFinding {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: InteractionSeverity,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    pub citation: String,
}

/// Interaction between the proposed drug's class and a chronic condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugConditionFinding {
    pub medication: String,
    pub medication_class: String,
    pub condition: String,
    pub severity: InteractionSeverity,
    pub effect: String,
    pub management: String,
}

/// Documented allergy match, direct or via cross-sensitivity.
/// Always critical; always blocks prescribing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergyFinding {
    pub kind: AllergyMatchKind,
    pub allergen: String,
    pub medication: String,
    pub severity: InteractionSeverity,
    pub message: String,
}

/// Renal dose-adjustment finding for a given eGFR.
/// Only non-"no adjustment" results are surfaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenalFinding {
    pub medication: String,
    pub egfr: f64,
    pub action: RenalAction,
    pub guidance: String,
    pub citation: String,
}

/// Dosing guidance attached to a safety check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DosingGuidance {
    pub standard_dose: Option<String>,
    pub max_dose: Option<String>,
    pub administration: Option<String>,
    pub adjustments: Vec<String>,
}

/// Structured safety report for one proposed medication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyReport {
    pub medication: String,
    pub safe_to_prescribe: bool,
    pub drug_drug: Vec<DrugDrugFinding>,
    pub drug_condition: Vec<DrugConditionFinding>,
    pub allergy: Vec<AllergyFinding>,
    pub renal: Vec<RenalFinding>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Opaque free text from the enrichment collaborator. Never parsed.
    pub ai_assessment: Option<String>,
    pub dosing: Option<DosingGuidance>,
}

impl SafetyReport {
    /// Whether any finding gates prescribing: a critical or major
    /// interaction, any allergy match, or a contraindicated renal result.
    pub fn has_blocking_finding(&self) -> bool {
        self.drug_drug.iter().any(|f| f.severity.is_blocking())
            || self.drug_condition.iter().any(|f| f.severity.is_blocking())
            || !self.allergy.is_empty()
            || self
                .renal
                .iter()
                .any(|f| f.action == RenalAction::Contraindicated)
    }
}
