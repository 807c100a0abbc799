use std::sync::Arc;

use crate::models::enums::{AllergyMatchKind, InteractionSeverity, RenalAction};
use crate::models::{
    AllergyFinding, DrugConditionFinding, DrugDrugFinding, RenalFinding, SafetyReport,
};

use super::catalog::{InteractionCatalog, RenalBucket, RenalRule};

/// Screens a proposed medication against the patient's current drugs,
/// allergies, chronic conditions, and renal function.
pub struct InteractionChecker {
    catalog: Arc<InteractionCatalog>,
}

/// Pick the renal bucket for an eGFR value.
///
/// Bucket labels are not uniformly spelled across drugs in the source
/// rule table ("eGFR 30-45" vs "eGFR 30-60"), so resolution falls back
/// permissively across both spellings rather than guessing boundaries.
fn resolve_bucket(rule: &RenalRule, egfr: f64) -> Option<&RenalBucket> {
    let labels: &[&str] = if egfr < 30.0 {
        &["eGFR<30"]
    } else if egfr < 60.0 {
        &["eGFR 30-60", "eGFR 30-45"]
    } else {
        &["eGFR>60", "eGFR>45"]
    };
    labels
        .iter()
        .find_map(|label| rule.buckets.iter().find(|b| b.label == *label))
}

impl InteractionChecker {
    pub fn new(catalog: Arc<InteractionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &InteractionCatalog {
        &self.catalog
    }

    /// Drug-drug findings for a proposed drug against each current one.
    pub fn drug_drug_findings(
        &self,
        new_drug: &str,
        current_medications: &[String],
    ) -> Vec<DrugDrugFinding> {
        current_medications
            .iter()
            .filter_map(|current| {
                self.catalog
                    .pair_interaction(new_drug, current)
                    .map(|entry| DrugDrugFinding {
                        drug_a: new_drug.to_string(),
                        drug_b: current.clone(),
                        severity: entry.severity,
                        mechanism: entry.mechanism.clone(),
                        clinical_effect: entry.clinical_effect.clone(),
                        management: entry.management.clone(),
                        citation: entry.citation.clone(),
                    })
            })
            .collect()
    }

    fn drug_condition_findings(
        &self,
        new_drug: &str,
        conditions: &[String],
    ) -> Vec<DrugConditionFinding> {
        let Some(class) = self.catalog.drug_class(new_drug) else {
            return Vec::new();
        };
        let rules = self.catalog.condition_rules_for(class);

        conditions
            .iter()
            .filter_map(|condition| {
                rules
                    .iter()
                    .find(|r| r.condition.eq_ignore_ascii_case(condition))
                    .map(|rule| DrugConditionFinding {
                        medication: new_drug.to_string(),
                        medication_class: class.to_string(),
                        condition: rule.condition.clone(),
                        severity: rule.severity,
                        effect: rule.effect.clone(),
                        management: rule.management.clone(),
                    })
            })
            .collect()
    }

    fn allergy_findings(&self, new_drug: &str, allergies: &[String]) -> Vec<AllergyFinding> {
        let drug_lower = new_drug.to_lowercase();
        let mut findings = Vec::new();

        for allergy in allergies {
            if drug_lower == allergy.to_lowercase() {
                findings.push(AllergyFinding {
                    kind: AllergyMatchKind::DirectAllergy,
                    allergen: allergy.clone(),
                    medication: new_drug.to_string(),
                    severity: InteractionSeverity::Critical,
                    message: format!("Patient has documented allergy to {new_drug}"),
                });
                continue;
            }

            for rule in self.catalog.cross_sensitivities() {
                if allergy.to_lowercase().contains(&rule.allergen_marker)
                    && rule.related_drugs.iter().any(|d| d == &drug_lower)
                {
                    findings.push(AllergyFinding {
                        kind: AllergyMatchKind::CrossSensitivity,
                        allergen: allergy.clone(),
                        medication: new_drug.to_string(),
                        severity: InteractionSeverity::Critical,
                        message: format!(
                            "Patient allergic to {}. {new_drug} is a {} derivative.",
                            rule.family, rule.family
                        ),
                    });
                }
            }
        }

        findings
    }

    /// Renal dose-adjustment finding, if the drug has a rule and the
    /// resolved bucket requires action.
    fn renal_finding(&self, new_drug: &str, egfr: f64) -> Option<RenalFinding> {
        let rule = self.catalog.renal_rule(new_drug)?;
        let bucket = resolve_bucket(rule, egfr)?;
        if bucket.action == RenalAction::NoAdjustment {
            return None;
        }
        Some(RenalFinding {
            medication: rule.drug.clone(),
            egfr,
            action: bucket.action,
            guidance: bucket.guidance.clone(),
            citation: rule.citation.clone(),
        })
    }

    /// Comprehensive safety check for one proposed medication.
    pub fn check_all(
        &self,
        new_drug: &str,
        current_medications: &[String],
        allergies: &[String],
        conditions: &[String],
        renal_function: Option<f64>,
    ) -> SafetyReport {
        let drug_drug = self.drug_drug_findings(new_drug, current_medications);
        let drug_condition = self.drug_condition_findings(new_drug, conditions);
        let allergy = self.allergy_findings(new_drug, allergies);
        let renal: Vec<RenalFinding> = renal_function
            .and_then(|egfr| self.renal_finding(new_drug, egfr))
            .into_iter()
            .collect();

        let mut warnings = Vec::new();
        if drug_drug.iter().any(|f| f.severity.is_blocking()) {
            warnings.push("Major drug-drug interaction detected".to_string());
        }
        if drug_condition.iter().any(|f| f.severity.is_blocking()) {
            warnings.push("Major drug-condition interaction detected".to_string());
        }
        if !allergy.is_empty() {
            warnings.push("ALLERGY ALERT".to_string());
        }
        if renal.iter().any(|f| f.action == RenalAction::Contraindicated) {
            warnings.push("Contraindicated in renal impairment".to_string());
        }

        let mut report = SafetyReport {
            medication: new_drug.to_string(),
            safe_to_prescribe: true,
            drug_drug,
            drug_condition,
            allergy,
            renal,
            warnings,
            recommendations: Vec::new(),
            ai_assessment: None,
            dosing: None,
        };
        report.safe_to_prescribe = !report.has_blocking_finding();
        report.recommendations = build_recommendations(&report);

        tracing::info!(
            medication = new_drug,
            safe = report.safe_to_prescribe,
            drug_drug = report.drug_drug.len(),
            drug_condition = report.drug_condition.len(),
            allergy = report.allergy.len(),
            renal = report.renal.len(),
            "Safety check complete"
        );

        report
    }
}

fn build_recommendations(report: &SafetyReport) -> Vec<String> {
    let mut recommendations = Vec::new();

    if !report.safe_to_prescribe {
        recommendations.push("Review all alerts before prescribing".to_string());
    }
    if !report.allergy.is_empty() {
        recommendations.push("Consider alternative medication due to allergy".to_string());
    }
    if report.drug_drug.iter().any(|f| f.severity.is_blocking()) {
        recommendations
            .push("Consider alternative medication or adjust current therapy".to_string());
    }
    if !report.renal.is_empty() {
        recommendations.push("Adjust dose based on renal function".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("No major safety concerns identified".to_string());
        recommendations.push("Monitor patient response and adherence".to_string());
    }

    recommendations
}
