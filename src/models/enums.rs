use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(DiagnosisSeverity {
    Critical => "critical",
    High => "high",
    Moderate => "moderate",
    Low => "low",
    Info => "info",
});

impl DiagnosisSeverity {
    /// Ordinal rank used for tie-breaking candidate order.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Moderate => 2,
            Self::Low => 1,
            Self::Info => 0,
        }
    }
}

str_enum!(InteractionSeverity {
    Critical => "critical",
    Major => "major",
    Moderate => "moderate",
    Minor => "minor",
});

impl InteractionSeverity {
    /// Critical and major findings gate prescribing.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical | Self::Major)
    }
}

str_enum!(RiskSeverity {
    Low => "low",
    Moderate => "moderate",
    High => "high",
});

str_enum!(FeedbackAction {
    Accepted => "accepted",
    Dismissed => "dismissed",
    Modified => "modified",
});

str_enum!(SuggestionType {
    DifferentialDiagnosis => "differential_diagnosis",
    Medication => "medication",
    CarePathway => "care_pathway",
});

str_enum!(SuggestionFrequency {
    Low => "low",
    Normal => "normal",
    High => "high",
});

impl SuggestionFrequency {
    /// How many suggestions survive filtering for this setting.
    pub fn limit(&self) -> usize {
        match self {
            Self::Low => 3,
            Self::Normal => 5,
            Self::High => 10,
        }
    }
}

impl Default for SuggestionFrequency {
    fn default() -> Self {
        Self::Normal
    }
}

str_enum!(TriggerType {
    Passive => "passive",
    DiagnosisField => "diagnosis_field",
    PrescriptionField => "prescription_field",
});

str_enum!(ContextTrigger {
    NewSymptoms => "new_symptoms",
    NewLabResults => "new_lab_results",
    VitalSignsUpdated => "vital_signs_updated",
    DiagnosisFieldActive => "diagnosis_field_active",
    PrescriptionFieldActive => "prescription_field_active",
});

str_enum!(ActiveField {
    Diagnosis => "diagnosis",
    Prescription => "prescription",
});

str_enum!(AlertKind {
    RiskAlert => "risk_alert",
    MissingInfo => "missing_info",
    PreventiveCare => "preventive_care",
});

str_enum!(PathwayKind {
    LabTest => "lab_test",
    Monitoring => "monitoring",
    Referral => "referral",
});

str_enum!(AllergyMatchKind {
    DirectAllergy => "direct_allergy",
    CrossSensitivity => "cross_sensitivity",
});

str_enum!(RenalAction {
    Contraindicated => "contraindicated",
    ReduceDose => "reduce_dose",
    UseWithCaution => "use_with_caution",
    NoAdjustment => "no_adjustment",
});

str_enum!(EvidenceOrigin {
    Symptom => "symptom",
    History => "history",
});
