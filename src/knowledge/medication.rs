use crate::interaction::InteractionChecker;
use crate::models::{MedicationRecommendation, PatientContext};

use super::catalog::{KnowledgeCatalog, MedicationRule};

/// Whether any declared contraindication names one of the patient's
/// chronic conditions or allergies (case-insensitive).
fn is_contraindicated(rule: &MedicationRule, ctx: &PatientContext) -> bool {
    rule.contraindications.iter().any(|contraindication| {
        let lower = contraindication.to_lowercase();
        ctx.history
            .chronic_conditions
            .iter()
            .any(|c| c.to_lowercase() == lower)
            || ctx.history.allergies.iter().any(|a| a.to_lowercase() == lower)
    })
}

/// Medication options for a condition, excluding contraindicated drugs
/// and annotating survivors with drug-drug findings against the
/// patient's current medications.
pub fn medication_recommendations(
    catalog: &KnowledgeCatalog,
    checker: &InteractionChecker,
    condition: &str,
    ctx: &PatientContext,
) -> Vec<MedicationRecommendation> {
    let mut recommendations = Vec::new();

    for rule in catalog.medications_for_condition(condition) {
        if is_contraindicated(rule, ctx) {
            tracing::debug!(
                drug = %rule.drug,
                condition = %rule.condition,
                "Excluding contraindicated medication"
            );
            continue;
        }

        let interactions = checker.drug_drug_findings(&rule.drug, &ctx.current_medications);

        recommendations.push(MedicationRecommendation {
            drug: rule.drug.clone(),
            drug_class: rule.drug_class.clone(),
            condition: rule.condition.clone(),
            first_line: rule.first_line,
            benefits: rule.benefits.clone(),
            monitoring: rule.monitoring.clone(),
            side_effects: rule.side_effects.clone(),
            interactions,
            citations: rule.citations.clone(),
            preferred: false,
            preference_score: 0,
            safety: None,
        });
    }

    recommendations
}
