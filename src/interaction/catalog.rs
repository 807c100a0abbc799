use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::enums::{InteractionSeverity, RenalAction};

/// Canonical unordered drug-pair key: lowercased and sorted, so (A, B)
/// and (B, A) resolve to the same entry by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let mut a = a.to_lowercase();
        let mut b = b.to_lowercase();
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        Self { first: a, second: b }
    }
}

/// One interaction rule between two drugs or two drug classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub severity: InteractionSeverity,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    pub citation: String,
}

/// One drug-class vs chronic-condition rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRule {
    pub condition: String,
    pub severity: InteractionSeverity,
    pub effect: String,
    pub management: String,
}

/// Cross-sensitivity: an allergen family implying risk with related drugs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossSensitivityRule {
    /// Substring matched against recorded allergens, lowercased.
    pub allergen_marker: String,
    /// Drugs (lowercased) that share the sensitivity.
    pub related_drugs: Vec<String>,
    /// Family name used in the finding message.
    pub family: String,
}

/// One labeled renal dosing bucket.
///
/// Labels are kept exactly as the source rule table spells them; the
/// spellings are not uniform across drugs (see `resolve_bucket` in the
/// checker), and the boundaries are deliberately not normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenalBucket {
    pub label: String,
    pub action: RenalAction,
    pub guidance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenalRule {
    pub drug: String,
    pub buckets: Vec<RenalBucket>,
    pub citation: String,
}

/// Immutable interaction catalog, constructed once and shared read-only.
pub struct InteractionCatalog {
    drug_pairs: HashMap<PairKey, InteractionEntry>,
    class_pairs: HashMap<PairKey, InteractionEntry>,
    /// Lowercased drug name -> class name.
    drug_classes: HashMap<String, String>,
    /// Class name -> condition rules.
    condition_rules: HashMap<String, Vec<ConditionRule>>,
    cross_sensitivities: Vec<CrossSensitivityRule>,
    /// Lowercased drug name -> renal rule.
    renal_rules: HashMap<String, RenalRule>,
}

impl InteractionCatalog {
    /// Symmetric interaction lookup: exact drug pair first, then the
    /// class-pair table via the drug-class map.
    pub fn pair_interaction(&self, a: &str, b: &str) -> Option<&InteractionEntry> {
        if let Some(entry) = self.drug_pairs.get(&PairKey::new(a, b)) {
            return Some(entry);
        }
        let class_a = self.drug_class(a)?;
        let class_b = self.drug_class(b)?;
        self.class_pairs.get(&PairKey::new(class_a, class_b))
    }

    pub fn drug_class(&self, drug: &str) -> Option<&str> {
        self.drug_classes
            .get(&drug.to_lowercase())
            .map(String::as_str)
    }

    pub fn condition_rules_for(&self, class: &str) -> &[ConditionRule] {
        self.condition_rules
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cross_sensitivities(&self) -> &[CrossSensitivityRule] {
        &self.cross_sensitivities
    }

    pub fn renal_rule(&self, drug: &str) -> Option<&RenalRule> {
        self.renal_rules.get(&drug.to_lowercase())
    }

    /// The curated bundled catalog.
    pub fn bundled() -> Self {
        let mut drug_pairs = HashMap::new();
        drug_pairs.insert(
            PairKey::new("Warfarin", "Aspirin"),
            InteractionEntry {
                severity: InteractionSeverity::Major,
                mechanism: "Additive antiplatelet effect".into(),
                clinical_effect: "Significantly increased bleeding risk".into(),
                management: "Avoid combination if possible. If necessary, monitor INR closely and watch for bleeding.".into(),
                citation: "CHEST Guidelines on Antithrombotic Therapy".into(),
            },
        );
        drug_pairs.insert(
            PairKey::new("Metformin", "Contrast dye"),
            InteractionEntry {
                severity: InteractionSeverity::Major,
                mechanism: "Increased risk of lactic acidosis".into(),
                clinical_effect: "Potentially fatal lactic acidosis".into(),
                management: "Hold metformin 48 hours before and after contrast administration. Check renal function.".into(),
                citation: "ACR Manual on Contrast Media v2023".into(),
            },
        );
        drug_pairs.insert(
            PairKey::new("ACE Inhibitor", "Potassium supplement"),
            InteractionEntry {
                severity: InteractionSeverity::Moderate,
                mechanism: "Decreased potassium excretion".into(),
                clinical_effect: "Hyperkalemia".into(),
                management: "Monitor serum potassium regularly. Consider dose adjustment.".into(),
                citation: "Drug Interaction Facts".into(),
            },
        );
        drug_pairs.insert(
            PairKey::new("Simvastatin", "Clarithromycin"),
            InteractionEntry {
                severity: InteractionSeverity::Major,
                mechanism: "CYP3A4 inhibition".into(),
                clinical_effect: "Increased risk of rhabdomyolysis".into(),
                management: "Avoid combination. Consider alternative antibiotic or statin.".into(),
                citation: "FDA Drug Safety Communication".into(),
            },
        );

        let mut class_pairs = HashMap::new();
        class_pairs.insert(
            PairKey::new("ACE Inhibitor", "Potassium-sparing diuretic"),
            InteractionEntry {
                severity: InteractionSeverity::Moderate,
                mechanism: "Both increase potassium levels".into(),
                clinical_effect: "Hyperkalemia".into(),
                management: "Monitor potassium levels regularly".into(),
                citation: "Drug Interaction Database".into(),
            },
        );

        let drug_classes: HashMap<String, String> = [
            ("lisinopril", "ACE Inhibitor"),
            ("enalapril", "ACE Inhibitor"),
            ("spironolactone", "Potassium-sparing diuretic"),
            ("atorvastatin", "Statin"),
            ("simvastatin", "Statin"),
            ("clarithromycin", "Macrolide antibiotic"),
            ("erythromycin", "Macrolide antibiotic"),
            ("metoprolol", "Beta-blocker"),
            ("atenolol", "Beta-blocker"),
            ("ibuprofen", "NSAID"),
            ("naproxen", "NSAID"),
            ("diclofenac", "NSAID"),
            ("metformin", "Metformin"),
            ("amoxicillin", "Penicillin"),
            ("ampicillin", "Penicillin"),
        ]
        .into_iter()
        .map(|(drug, class)| (drug.to_string(), class.to_string()))
        .collect();

        let mut condition_rules = HashMap::new();
        condition_rules.insert(
            "Beta-blocker".to_string(),
            vec![
                ConditionRule {
                    condition: "Asthma".into(),
                    severity: InteractionSeverity::Major,
                    effect: "Bronchospasm".into(),
                    management: "Avoid non-selective beta-blockers. Use cardioselective if necessary.".into(),
                },
                ConditionRule {
                    condition: "Diabetes".into(),
                    severity: InteractionSeverity::Moderate,
                    effect: "Masks hypoglycemia symptoms".into(),
                    management: "Monitor blood glucose closely. Educate patient.".into(),
                },
            ],
        );
        condition_rules.insert(
            "NSAID".to_string(),
            vec![
                ConditionRule {
                    condition: "Chronic Kidney Disease".into(),
                    severity: InteractionSeverity::Major,
                    effect: "Acute kidney injury, worsening renal function".into(),
                    management: "Avoid if possible. Use lowest effective dose for shortest duration.".into(),
                },
                ConditionRule {
                    condition: "Heart Failure".into(),
                    severity: InteractionSeverity::Major,
                    effect: "Fluid retention, worsening heart failure".into(),
                    management: "Avoid. Consider alternative analgesics.".into(),
                },
                ConditionRule {
                    condition: "Hypertension".into(),
                    severity: InteractionSeverity::Moderate,
                    effect: "Reduced antihypertensive efficacy".into(),
                    management: "Monitor blood pressure. May need to adjust antihypertensive therapy.".into(),
                },
            ],
        );
        condition_rules.insert(
            "Metformin".to_string(),
            vec![
                ConditionRule {
                    condition: "Chronic Kidney Disease".into(),
                    severity: InteractionSeverity::Major,
                    effect: "Lactic acidosis risk".into(),
                    management: "Contraindicated if eGFR <30. Use caution if eGFR 30-45.".into(),
                },
                ConditionRule {
                    condition: "Liver Disease".into(),
                    severity: InteractionSeverity::Major,
                    effect: "Lactic acidosis risk".into(),
                    management: "Avoid in severe hepatic impairment.".into(),
                },
            ],
        );

        let cross_sensitivities = vec![CrossSensitivityRule {
            allergen_marker: "penicillin".into(),
            related_drugs: vec!["amoxicillin".into(), "ampicillin".into()],
            family: "penicillin".into(),
        }];

        let mut renal_rules = HashMap::new();
        renal_rules.insert(
            "metformin".to_string(),
            RenalRule {
                drug: "Metformin".into(),
                buckets: vec![
                    RenalBucket {
                        label: "eGFR<30".into(),
                        action: RenalAction::Contraindicated,
                        guidance: "Contraindicated".into(),
                    },
                    RenalBucket {
                        label: "eGFR 30-45".into(),
                        action: RenalAction::UseWithCaution,
                        guidance: "Use with caution, monitor closely".into(),
                    },
                    RenalBucket {
                        label: "eGFR>45".into(),
                        action: RenalAction::NoAdjustment,
                        guidance: "No adjustment needed".into(),
                    },
                ],
                citation: "Renal Drug Handbook".into(),
            },
        );
        renal_rules.insert(
            "gabapentin".to_string(),
            RenalRule {
                drug: "Gabapentin".into(),
                buckets: vec![
                    RenalBucket {
                        label: "eGFR<30".into(),
                        action: RenalAction::ReduceDose,
                        guidance: "Reduce dose by 50-75%".into(),
                    },
                    RenalBucket {
                        label: "eGFR 30-60".into(),
                        action: RenalAction::ReduceDose,
                        guidance: "Reduce dose by 25-50%".into(),
                    },
                    RenalBucket {
                        label: "eGFR>60".into(),
                        action: RenalAction::NoAdjustment,
                        guidance: "No adjustment needed".into(),
                    },
                ],
                citation: "Renal Drug Handbook".into(),
            },
        );

        Self {
            drug_pairs,
            class_pairs,
            drug_classes,
            condition_rules,
            cross_sensitivities,
            renal_rules,
        }
    }
}
