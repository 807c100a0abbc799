use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::enums::{SuggestionFrequency, SuggestionType};
use crate::models::{DismissalRecord, FeedbackEvent, PreferenceProfile, PreferredMedication};

use super::{PreferenceStore, StoreError};

/// rusqlite-backed [`PreferenceStore`].
///
/// All counter mutations are single `ON CONFLICT ... count = count + 1`
/// statements, so concurrent feedback from the same operator increments
/// rather than overwrites.
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Create the profile row lazily and bump its updated timestamp.
    fn touch_profile(conn: &Connection, operator_id: Uuid) -> Result<(), StoreError> {
        let now = Utc::now();
        conn.execute(
            "INSERT INTO preference_profiles (operator_id, suggestion_frequency, created_at, updated_at)
             VALUES (?1, 'normal', ?2, ?2)
             ON CONFLICT(operator_id) DO UPDATE SET updated_at = ?2",
            params![operator_id, now],
        )?;
        Ok(())
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get_profile(&self, operator_id: Uuid) -> Result<PreferenceProfile, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;

        let head = conn
            .prepare(
                "SELECT suggestion_frequency, created_at, updated_at
                 FROM preference_profiles WHERE operator_id = ?1",
            )?
            .query_row(params![operator_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, DateTime<Utc>>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                ))
            })
            .optional()?;

        let Some((frequency_raw, created_at, updated_at)) = head else {
            return Ok(PreferenceProfile::default_for(operator_id));
        };

        let suggestion_frequency = frequency_raw
            .parse()
            .unwrap_or(SuggestionFrequency::Normal);

        let mut stmt = conn.prepare(
            "SELECT suggestion_type, fingerprint, count, last_reason, last_dismissed
             FROM dismissed_suggestions WHERE operator_id = ?1
             ORDER BY suggestion_type, fingerprint",
        )?;
        let dismissals = stmt
            .query_map(params![operator_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, DateTime<Utc>>(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(type_raw, fingerprint, count, last_reason, last_dismissed)| {
                match type_raw.parse::<SuggestionType>() {
                    Ok(suggestion_type) => Some(DismissalRecord {
                        suggestion_type,
                        fingerprint,
                        count,
                        last_reason,
                        last_dismissed,
                    }),
                    Err(_) => {
                        tracing::warn!(value = %type_raw, "Skipping dismissal with unknown suggestion type");
                        None
                    }
                }
            })
            .collect();

        let mut stmt = conn.prepare(
            "SELECT condition, drug, count FROM preferred_medications
             WHERE operator_id = ?1 ORDER BY condition, drug",
        )?;
        let preferred_medications = stmt
            .query_map(params![operator_id], |row| {
                Ok(PreferredMedication {
                    condition: row.get(0)?,
                    drug: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(PreferenceProfile {
            operator_id,
            dismissals,
            preferred_medications,
            suggestion_frequency,
            created_at,
            updated_at,
        })
    }

    fn record_dismissal(
        &self,
        operator_id: Uuid,
        suggestion_type: SuggestionType,
        fingerprint: &str,
        reason: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        Self::touch_profile(&conn, operator_id)?;
        conn.execute(
            "INSERT INTO dismissed_suggestions
                 (operator_id, suggestion_type, fingerprint, count, last_reason, last_dismissed)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)
             ON CONFLICT(operator_id, suggestion_type, fingerprint) DO UPDATE SET
                 count = count + 1,
                 last_reason = COALESCE(excluded.last_reason, dismissed_suggestions.last_reason),
                 last_dismissed = excluded.last_dismissed",
            params![
                operator_id,
                suggestion_type.as_str(),
                fingerprint,
                reason,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    fn record_preferred_medication(
        &self,
        operator_id: Uuid,
        condition: &str,
        drug: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        Self::touch_profile(&conn, operator_id)?;
        conn.execute(
            "INSERT INTO preferred_medications (operator_id, condition, drug, count)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(operator_id, condition, drug) DO UPDATE SET count = count + 1",
            params![operator_id, condition, drug],
        )?;
        Ok(())
    }

    fn set_suggestion_frequency(
        &self,
        operator_id: Uuid,
        frequency: SuggestionFrequency,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        Self::touch_profile(&conn, operator_id)?;
        conn.execute(
            "UPDATE preference_profiles SET suggestion_frequency = ?2, updated_at = ?3
             WHERE operator_id = ?1",
            params![operator_id, frequency.as_str(), Utc::now()],
        )?;
        Ok(())
    }

    fn append_feedback(&self, event: &FeedbackEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        conn.execute(
            "INSERT INTO feedback_events
                 (id, operator_id, suggestion_type, content, action, reason, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id,
                event.operator_id,
                event.suggestion_type.as_str(),
                event.content.to_string(),
                event.action.as_str(),
                event.reason,
                event.recorded_at,
            ],
        )?;
        Ok(())
    }

    fn query_feedback(
        &self,
        operator_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackEvent>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        let mut stmt = conn.prepare(
            "SELECT id, operator_id, suggestion_type, content, action, reason, recorded_at
             FROM feedback_events
             WHERE operator_id = ?1 AND recorded_at >= ?2
             ORDER BY recorded_at",
        )?;
        let rows = stmt.query_map(params![operator_id, since], |row| {
            Ok((
                row.get::<_, Uuid>(0)?,
                row.get::<_, Uuid>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, DateTime<Utc>>(6)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, operator_id, type_raw, content_raw, action_raw, reason, recorded_at) = row?;
            events.push(FeedbackEvent {
                id,
                operator_id,
                suggestion_type: type_raw.parse()?,
                content: serde_json::from_str(&content_raw).unwrap_or(serde_json::Value::Null),
                action: action_raw.parse()?,
                reason,
                recorded_at,
            });
        }
        Ok(events)
    }
}
