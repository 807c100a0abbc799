//! Operator preference learning: an append-only feedback log drives
//! per-operator suppression, medication preference ranking, and usage
//! analytics.
//!
//! Profile updates are targeted counter increments at the store layer.
//! Concurrent feedback from the same operator therefore accumulates
//! instead of overwriting, but no ordering is guaranteed across events;
//! the profile is eventually consistent, not strictly serializable.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::CdsError;
use crate::models::enums::{FeedbackAction, SuggestionFrequency, SuggestionType};
use crate::models::{
    DiagnosisCandidate, FeedbackAnalytics, FeedbackEvent, MedicationRecommendation,
    PreferenceProfile,
};
use crate::store::PreferenceStore;

/// Suggestions dismissed more than this many times stop being shown.
const SUPPRESSION_THRESHOLD: i64 = 3;

/// A suggestion the learning system can filter and rank.
///
/// Fingerprints are intentionally coarse: two suggestions match when the
/// identity field (diagnosis name or drug name) matches, nothing more.
pub trait Suggestion {
    fn fingerprint(&self) -> String;

    /// (condition, drug) key for preference boosting, where applicable.
    fn preference_key(&self) -> Option<(String, String)> {
        None
    }

    fn apply_preference(&mut self, _usage_count: i64) {}

    fn is_preferred(&self) -> bool {
        false
    }
}

impl Suggestion for DiagnosisCandidate {
    fn fingerprint(&self) -> String {
        self.diagnosis.to_lowercase()
    }
}

impl Suggestion for MedicationRecommendation {
    fn fingerprint(&self) -> String {
        self.drug.to_lowercase()
    }

    fn preference_key(&self) -> Option<(String, String)> {
        Some((self.condition.clone(), self.drug.clone()))
    }

    fn apply_preference(&mut self, usage_count: i64) {
        self.preferred = true;
        self.preference_score = usage_count;
    }

    fn is_preferred(&self) -> bool {
        self.preferred
    }
}

/// Extract the coarse identity fingerprint from a content snapshot.
fn fingerprint_of(content: &serde_json::Value) -> Option<String> {
    content
        .get("diagnosis")
        .and_then(|v| v.as_str())
        .or_else(|| content.get("drug").and_then(|v| v.as_str()))
        .map(|s| s.to_lowercase())
}

pub struct LearningSystem {
    prefs: Arc<dyn PreferenceStore>,
}

impl LearningSystem {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Append a feedback event, then apply its targeted profile updates.
    pub fn record_feedback(
        &self,
        operator_id: Uuid,
        suggestion_type: SuggestionType,
        content: serde_json::Value,
        action: FeedbackAction,
        reason: Option<String>,
    ) -> Result<(), CdsError> {
        let event = FeedbackEvent {
            id: Uuid::new_v4(),
            operator_id,
            suggestion_type,
            content,
            action,
            reason,
            recorded_at: Utc::now(),
        };
        self.prefs.append_feedback(&event)?;

        match action {
            FeedbackAction::Dismissed => match fingerprint_of(&event.content) {
                Some(fingerprint) => {
                    self.prefs.record_dismissal(
                        operator_id,
                        suggestion_type,
                        &fingerprint,
                        event.reason.as_deref(),
                    )?;
                }
                None => {
                    tracing::warn!(
                        operator_id = %operator_id,
                        "Dismissed suggestion has no identity field, counter not updated"
                    );
                }
            },
            FeedbackAction::Accepted if suggestion_type == SuggestionType::Medication => {
                let drug = event.content.get("drug").and_then(|v| v.as_str());
                let condition = event.content.get("condition").and_then(|v| v.as_str());
                if let (Some(drug), Some(condition)) = (drug, condition) {
                    self.prefs
                        .record_preferred_medication(operator_id, condition, drug)?;
                }
            }
            _ => {}
        }

        tracing::info!(
            operator_id = %operator_id,
            suggestion_type = suggestion_type.as_str(),
            action = action.as_str(),
            "Feedback recorded"
        );
        Ok(())
    }

    /// Filter and rank a suggestion list for one operator: drop
    /// repeatedly-dismissed entries, rank previously-accepted medications
    /// forward, and truncate to the operator's frequency setting.
    pub fn filter_suggestions<S: Suggestion>(
        &self,
        operator_id: Uuid,
        suggestions: Vec<S>,
        suggestion_type: SuggestionType,
    ) -> Result<Vec<S>, CdsError> {
        let profile = self.prefs.get_profile(operator_id)?;

        let mut filtered: Vec<S> = suggestions
            .into_iter()
            .filter(|s| {
                let fingerprint = s.fingerprint();
                let dismissed = profile.dismissal_count(suggestion_type, &fingerprint);
                if dismissed > SUPPRESSION_THRESHOLD {
                    tracing::debug!(
                        operator_id = %operator_id,
                        fingerprint,
                        dismissed,
                        "Suppressing repeatedly dismissed suggestion"
                    );
                    return false;
                }
                true
            })
            .collect();

        for suggestion in &mut filtered {
            if let Some((condition, drug)) = suggestion.preference_key() {
                if let Some(count) = profile.preferred_count(&condition, &drug) {
                    suggestion.apply_preference(count);
                }
            }
        }

        // Stable: preferred entries move forward, everything else keeps
        // its deterministic order.
        filtered.sort_by_key(|s| if s.is_preferred() { 0u8 } else { 1u8 });
        filtered.truncate(profile.suggestion_frequency.limit());

        Ok(filtered)
    }

    pub fn profile(&self, operator_id: Uuid) -> Result<PreferenceProfile, CdsError> {
        Ok(self.prefs.get_profile(operator_id)?)
    }

    pub fn set_suggestion_frequency(
        &self,
        operator_id: Uuid,
        frequency: SuggestionFrequency,
    ) -> Result<(), CdsError> {
        Ok(self.prefs.set_suggestion_frequency(operator_id, frequency)?)
    }

    /// Usage analytics over a trailing window.
    pub fn analytics(
        &self,
        operator_id: Uuid,
        window_days: u32,
    ) -> Result<FeedbackAnalytics, CdsError> {
        let since = Utc::now() - Duration::days(i64::from(window_days));
        let events = self.prefs.query_feedback(operator_id, since)?;

        let total = events.len();
        let count_of = |action: FeedbackAction| {
            events.iter().filter(|e| e.action == action).count()
        };
        let accepted = count_of(FeedbackAction::Accepted);
        let dismissed = count_of(FeedbackAction::Dismissed);
        let modified = count_of(FeedbackAction::Modified);

        let acceptance_rate = if total > 0 {
            ((accepted as f64 / total as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let mut dismissal_reasons = std::collections::HashMap::new();
        for event in &events {
            if event.action == FeedbackAction::Dismissed {
                if let Some(reason) = &event.reason {
                    *dismissal_reasons.entry(reason.clone()).or_insert(0) += 1;
                }
            }
        }

        Ok(FeedbackAnalytics {
            period_days: window_days,
            total_suggestions: total,
            accepted,
            dismissed,
            modified,
            acceptance_rate,
            dismissal_reasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::enums::DiagnosisSeverity;
    use crate::store::{open_memory_database, SqlitePreferenceStore};

    fn system() -> LearningSystem {
        LearningSystem::new(Arc::new(SqlitePreferenceStore::new(
            open_memory_database().unwrap(),
        )))
    }

    fn ddx(name: &str) -> DiagnosisCandidate {
        DiagnosisCandidate {
            diagnosis: name.into(),
            confidence: 50.0,
            severity: DiagnosisSeverity::Low,
            supporting_evidence: vec![],
            next_steps: vec![],
            citations: vec![],
            ai_annotation: None,
        }
    }

    fn med(drug: &str, condition: &str) -> MedicationRecommendation {
        MedicationRecommendation {
            drug: drug.into(),
            drug_class: "Test".into(),
            condition: condition.into(),
            first_line: false,
            benefits: vec![],
            monitoring: vec![],
            side_effects: vec![],
            interactions: vec![],
            citations: vec![],
            preferred: false,
            preference_score: 0,
            safety: None,
        }
    }

    fn dismiss(system: &LearningSystem, operator: Uuid, diagnosis: &str, times: usize) {
        for _ in 0..times {
            system
                .record_feedback(
                    operator,
                    SuggestionType::DifferentialDiagnosis,
                    json!({"diagnosis": diagnosis}),
                    FeedbackAction::Dismissed,
                    None,
                )
                .unwrap();
        }
    }

    #[test]
    fn four_dismissals_suppress_fifth_occurrence() {
        let system = system();
        let operator = Uuid::new_v4();
        dismiss(&system, operator, "Musculoskeletal Pain", 4);

        let filtered = system
            .filter_suggestions(
                operator,
                vec![ddx("Musculoskeletal Pain"), ddx("Bacterial Pneumonia")],
                SuggestionType::DifferentialDiagnosis,
            )
            .unwrap();

        let names: Vec<_> = filtered.iter().map(|c| c.diagnosis.as_str()).collect();
        assert_eq!(names, vec!["Bacterial Pneumonia"]);
    }

    #[test]
    fn three_dismissals_do_not_suppress() {
        let system = system();
        let operator = Uuid::new_v4();
        dismiss(&system, operator, "Musculoskeletal Pain", 3);

        let filtered = system
            .filter_suggestions(
                operator,
                vec![ddx("Musculoskeletal Pain")],
                SuggestionType::DifferentialDiagnosis,
            )
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn suppression_is_per_operator() {
        let system = system();
        let operator_a = Uuid::new_v4();
        let operator_b = Uuid::new_v4();
        dismiss(&system, operator_a, "Musculoskeletal Pain", 5);

        let for_b = system
            .filter_suggestions(
                operator_b,
                vec![ddx("Musculoskeletal Pain")],
                SuggestionType::DifferentialDiagnosis,
            )
            .unwrap();
        assert_eq!(for_b.len(), 1);
    }

    #[test]
    fn accepted_medication_is_flagged_and_ranked_forward() {
        let system = system();
        let operator = Uuid::new_v4();
        for _ in 0..2 {
            system
                .record_feedback(
                    operator,
                    SuggestionType::Medication,
                    json!({"drug": "Empagliflozin", "condition": "diabetes"}),
                    FeedbackAction::Accepted,
                    None,
                )
                .unwrap();
        }

        let filtered = system
            .filter_suggestions(
                operator,
                vec![med("Metformin", "diabetes"), med("Empagliflozin", "diabetes")],
                SuggestionType::Medication,
            )
            .unwrap();

        assert_eq!(filtered[0].drug, "Empagliflozin");
        assert!(filtered[0].preferred);
        assert_eq!(filtered[0].preference_score, 2);
        assert!(!filtered[1].preferred);
    }

    #[test]
    fn frequency_setting_truncates_list() {
        let system = system();
        let operator = Uuid::new_v4();
        system
            .set_suggestion_frequency(operator, SuggestionFrequency::Low)
            .unwrap();

        let suggestions: Vec<_> = (0..6).map(|i| ddx(&format!("Diagnosis {i}"))).collect();
        let filtered = system
            .filter_suggestions(operator, suggestions, SuggestionType::DifferentialDiagnosis)
            .unwrap();
        assert_eq!(filtered.len(), 3);
        // Deterministic order survives truncation
        assert_eq!(filtered[0].diagnosis, "Diagnosis 0");
    }

    #[test]
    fn default_frequency_keeps_five() {
        let system = system();
        let suggestions: Vec<_> = (0..8).map(|i| ddx(&format!("Diagnosis {i}"))).collect();
        let filtered = system
            .filter_suggestions(
                Uuid::new_v4(),
                suggestions,
                SuggestionType::DifferentialDiagnosis,
            )
            .unwrap();
        assert_eq!(filtered.len(), 5);
    }

    #[test]
    fn analytics_aggregate_counts_and_rate() {
        let system = system();
        let operator = Uuid::new_v4();

        system
            .record_feedback(
                operator,
                SuggestionType::Medication,
                json!({"drug": "Metformin", "condition": "diabetes"}),
                FeedbackAction::Accepted,
                None,
            )
            .unwrap();
        system
            .record_feedback(
                operator,
                SuggestionType::DifferentialDiagnosis,
                json!({"diagnosis": "GERD"}),
                FeedbackAction::Dismissed,
                Some("not relevant".into()),
            )
            .unwrap();
        system
            .record_feedback(
                operator,
                SuggestionType::DifferentialDiagnosis,
                json!({"diagnosis": "GERD"}),
                FeedbackAction::Dismissed,
                Some("not relevant".into()),
            )
            .unwrap();

        let analytics = system.analytics(operator, 30).unwrap();
        assert_eq!(analytics.total_suggestions, 3);
        assert_eq!(analytics.accepted, 1);
        assert_eq!(analytics.dismissed, 2);
        assert_eq!(analytics.modified, 0);
        assert_eq!(analytics.acceptance_rate, 33.3);
        assert_eq!(analytics.dismissal_reasons.get("not relevant"), Some(&2));
    }

    #[test]
    fn analytics_empty_window() {
        let system = system();
        let analytics = system.analytics(Uuid::new_v4(), 30).unwrap();
        assert_eq!(analytics.total_suggestions, 0);
        assert_eq!(analytics.acceptance_rate, 0.0);
    }

    #[test]
    fn modified_feedback_leaves_profile_counters_alone() {
        let system = system();
        let operator = Uuid::new_v4();
        system
            .record_feedback(
                operator,
                SuggestionType::Medication,
                json!({"drug": "Metformin", "condition": "diabetes"}),
                FeedbackAction::Modified,
                None,
            )
            .unwrap();

        let profile = system.profile(operator).unwrap();
        assert!(profile.dismissals.is_empty());
        assert!(profile.preferred_medications.is_empty());
    }
}
