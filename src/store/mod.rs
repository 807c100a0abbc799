pub mod preference;
pub mod record;
pub mod sqlite;

pub use preference::SqlitePreferenceStore;
pub use record::SqliteRecordStore;
pub use sqlite::{open_database, open_memory_database};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::{SuggestionFrequency, SuggestionType};
use crate::models::{FeedbackEvent, PreferenceProfile, RecordSummary, StoredPatient};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Internal lock failed")]
    LockFailed,
}

/// Read side of the external patient-record store.
///
/// The core only consumes this interface; query execution, retries and
/// at-rest encryption belong to the adapter behind it.
pub trait RecordStore: Send + Sync {
    fn fetch_patient_profile(&self, id: Uuid) -> Result<Option<StoredPatient>, StoreError>;

    /// Recent records for a patient, newest first, up to `limit`.
    fn fetch_recent_records(
        &self,
        patient_id: Uuid,
        limit: usize,
    ) -> Result<Vec<RecordSummary>, StoreError>;
}

/// Preference and feedback store for operator personalization.
///
/// Counter mutations are targeted operations rather than whole-profile
/// upserts so concurrent feedback from the same operator cannot lose
/// updates. The feedback log is append-only and safe under concurrent
/// writers; no ordering guarantee is made across events.
pub trait PreferenceStore: Send + Sync {
    /// The operator's profile, or a fresh default when none exists yet.
    fn get_profile(&self, operator_id: Uuid) -> Result<PreferenceProfile, StoreError>;

    /// Increment the dismissal counter for a (type, fingerprint) pair,
    /// creating the profile lazily.
    fn record_dismissal(
        &self,
        operator_id: Uuid,
        suggestion_type: SuggestionType,
        fingerprint: &str,
        reason: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Increment the accepted-usage counter for a (condition, drug) pair.
    fn record_preferred_medication(
        &self,
        operator_id: Uuid,
        condition: &str,
        drug: &str,
    ) -> Result<(), StoreError>;

    fn set_suggestion_frequency(
        &self,
        operator_id: Uuid,
        frequency: SuggestionFrequency,
    ) -> Result<(), StoreError>;

    fn append_feedback(&self, event: &FeedbackEvent) -> Result<(), StoreError>;

    fn query_feedback(
        &self,
        operator_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackEvent>, StoreError>;
}
