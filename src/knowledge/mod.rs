//! Curated medical knowledge: diagnosis rules, medication rules, and
//! clinical guidelines, loaded once into an immutable catalog.

pub mod catalog;
pub mod ddx;
pub mod medication;

pub use catalog::{ConfidenceFactor, DiagnosisRule, Guideline, KnowledgeCatalog, MedicationRule};
pub use ddx::differential_diagnosis;
pub use medication::medication_recommendations;
