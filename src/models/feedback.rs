use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{FeedbackAction, SuggestionFrequency, SuggestionType};

/// One recorded accept/dismiss/modify event.
/// Append-only and immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub id: Uuid,
    pub operator_id: Uuid,
    pub suggestion_type: SuggestionType,
    /// Snapshot of the suggestion as presented. Opaque to the store;
    /// only the identity fields (diagnosis, drug, condition) are read back.
    pub content: serde_json::Value,
    pub action: FeedbackAction,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Cumulative dismissal counter for one (type, fingerprint) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DismissalRecord {
    pub suggestion_type: SuggestionType,
    pub fingerprint: String,
    pub count: i64,
    pub last_reason: Option<String>,
    pub last_dismissed: DateTime<Utc>,
}

/// Usage counter for an accepted (condition, drug) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferredMedication {
    pub condition: String,
    pub drug: String,
    pub count: i64,
}

/// Per-operator personalization profile, created lazily on first
/// feedback and never hard-deleted. Counters are maintained by targeted
/// store-level increments, so concurrent feedback cannot lose updates;
/// cross-event ordering stays eventually consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub operator_id: Uuid,
    pub dismissals: Vec<DismissalRecord>,
    pub preferred_medications: Vec<PreferredMedication>,
    pub suggestion_frequency: SuggestionFrequency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PreferenceProfile {
    /// Fresh profile for an operator with no recorded feedback.
    pub fn default_for(operator_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            operator_id,
            dismissals: Vec::new(),
            preferred_medications: Vec::new(),
            suggestion_frequency: SuggestionFrequency::Normal,
            created_at: now,
            updated_at: now,
        }
    }

    /// Cumulative dismiss count for a (type, fingerprint) pair.
    pub fn dismissal_count(&self, suggestion_type: SuggestionType, fingerprint: &str) -> i64 {
        self.dismissals
            .iter()
            .find(|d| d.suggestion_type == suggestion_type && d.fingerprint == fingerprint)
            .map(|d| d.count)
            .unwrap_or(0)
    }

    /// Accepted-usage count for a (condition, drug) pair, if any.
    pub fn preferred_count(&self, condition: &str, drug: &str) -> Option<i64> {
        let condition = condition.to_lowercase();
        let drug = drug.to_lowercase();
        self.preferred_medications
            .iter()
            .find(|p| p.condition.to_lowercase() == condition && p.drug.to_lowercase() == drug)
            .map(|p| p.count)
    }
}

/// Aggregate feedback counts over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAnalytics {
    pub period_days: u32,
    pub total_suggestions: usize,
    pub accepted: usize,
    pub dismissed: usize,
    pub modified: usize,
    /// Percentage, one decimal. Zero when no feedback exists.
    pub acceptance_rate: f64,
    pub dismissal_reasons: HashMap<String, usize>,
}
