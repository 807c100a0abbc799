//! Medication safety screening: drug-drug, drug-condition, drug-allergy,
//! and renal dose-adjustment rules over an immutable catalog.

pub mod catalog;
pub mod checker;

pub use catalog::{
    ConditionRule, CrossSensitivityRule, InteractionCatalog, InteractionEntry, PairKey,
    RenalBucket, RenalRule,
};
pub use checker::InteractionChecker;
