use crate::models::enums::EvidenceOrigin;
use crate::models::{DiagnosisCandidate, Evidence, PatientContext};

use super::catalog::{ConfidenceFactor, KnowledgeCatalog};

/// Round to one decimal; confidence values carry exactly one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Numeric context attribute referenced by threshold factors.
fn numeric_attribute(ctx: &PatientContext, attribute: &str) -> Option<f64> {
    match attribute {
        "age" => ctx.demographics.age.map(f64::from),
        "bmi" => ctx.vitals.bmi,
        "egfr" => ctx.renal_function,
        _ => None,
    }
}

/// Generate ranked differential-diagnosis candidates for the presenting
/// symptoms under the given context.
///
/// Deterministic: identical (symptoms, context) input yields an identical,
/// identically-ordered list. Order is confidence descending, ties broken
/// by severity rank, then by rule-table order (stable sort).
pub fn differential_diagnosis(
    catalog: &KnowledgeCatalog,
    symptoms: &[String],
    ctx: &PatientContext,
) -> Vec<DiagnosisCandidate> {
    let symptoms_lower: Vec<String> = symptoms.iter().map(|s| s.to_lowercase()).collect();

    let mut candidates = Vec::new();
    for symptom in symptoms {
        for rule in catalog.rules_for_symptom(symptom) {
            let total = rule.factors.len();
            let mut matched = 0usize;
            let mut evidence = Vec::new();

            for factor in &rule.factors {
                match factor {
                    ConfidenceFactor::Term(term) => {
                        if symptoms_lower.iter().any(|s| s == term) {
                            matched += 1;
                            evidence.push(Evidence {
                                origin: EvidenceOrigin::Symptom,
                                factor: term.clone(),
                            });
                        } else if ctx
                            .history
                            .chronic_conditions
                            .iter()
                            .any(|c| c.to_lowercase().contains(term.as_str()))
                        {
                            matched += 1;
                            evidence.push(Evidence {
                                origin: EvidenceOrigin::History,
                                factor: term.clone(),
                            });
                        }
                    }
                    ConfidenceFactor::Threshold { attribute, min } => {
                        if numeric_attribute(ctx, attribute).is_some_and(|v| v > *min) {
                            matched += 1;
                        }
                    }
                }
            }

            let confidence = if total == 0 {
                0.0
            } else {
                round1(matched as f64 / total as f64 * 100.0)
            };

            candidates.push(DiagnosisCandidate {
                diagnosis: rule.diagnosis.clone(),
                confidence,
                severity: rule.severity,
                supporting_evidence: evidence,
                next_steps: rule.next_steps.clone(),
                citations: rule.citations.clone(),
                ai_annotation: None,
            });
        }
    }

    // Stable sort keeps rule-table order for full ties.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.severity.rank().cmp(&a.severity.rank()))
    });

    candidates
}
