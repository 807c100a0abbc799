use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::{RecordSummary, StoredPatient};

use super::{RecordStore, StoreError};

/// rusqlite-backed reference implementation of [`RecordStore`].
///
/// A production deployment points the trait at whatever holds the real
/// patient records; this implementation backs tests and single-node use.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn insert_patient(&self, patient: &StoredPatient) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        conn.execute(
            "INSERT INTO patients (
                id, name, birth_date, gender, blood_group, height, weight, egfr,
                chronic_conditions, allergies, family_history, current_medications
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                patient.id,
                patient.name,
                patient.birth_date,
                patient.gender,
                patient.blood_group,
                patient.height,
                patient.weight,
                patient.egfr,
                serde_json::to_string(&patient.chronic_conditions).unwrap_or_default(),
                serde_json::to_string(&patient.allergies).unwrap_or_default(),
                serde_json::to_string(&patient.family_history).unwrap_or_default(),
                serde_json::to_string(&patient.current_medications).unwrap_or_default(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_record(
        &self,
        patient_id: Uuid,
        summary: &RecordSummary,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        conn.execute(
            "INSERT INTO patient_records (id, patient_id, file_name, file_type, description, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                summary.record_id,
                patient_id,
                summary.file_name,
                summary.file_type,
                summary.description,
                summary.uploaded_at,
            ],
        )?;
        Ok(())
    }

    /// Soft-delete a record so it no longer appears in recent summaries.
    pub fn delete_record(&self, record_id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        conn.execute(
            "UPDATE patient_records SET is_deleted = 1 WHERE id = ?1",
            params![record_id],
        )?;
        Ok(())
    }
}

/// Parse a JSON list column, degrading to empty on malformed content.
fn parse_list(raw: Option<String>, column: &str) -> Vec<String> {
    match raw {
        Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(column, error = %e, "Malformed JSON list column, treating as empty");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

impl RecordStore for SqliteRecordStore {
    fn fetch_patient_profile(&self, id: Uuid) -> Result<Option<StoredPatient>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        let mut stmt = conn.prepare(
            "SELECT id, name, birth_date, gender, blood_group, height, weight, egfr,
                    chronic_conditions, allergies, family_history, current_medications
             FROM patients WHERE id = ?1",
        )?;
        let patient = stmt
            .query_row(params![id], |row| {
                Ok(StoredPatient {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    birth_date: row.get(2)?,
                    gender: row.get(3)?,
                    blood_group: row.get(4)?,
                    height: row.get(5)?,
                    weight: row.get(6)?,
                    egfr: row.get(7)?,
                    chronic_conditions: parse_list(row.get(8)?, "chronic_conditions"),
                    allergies: parse_list(row.get(9)?, "allergies"),
                    family_history: parse_list(row.get(10)?, "family_history"),
                    current_medications: parse_list(row.get(11)?, "current_medications"),
                })
            })
            .optional()?;
        Ok(patient)
    }

    fn fetch_recent_records(
        &self,
        patient_id: Uuid,
        limit: usize,
    ) -> Result<Vec<RecordSummary>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        let mut stmt = conn.prepare(
            "SELECT id, file_name, file_type, description, uploaded_at
             FROM patient_records
             WHERE patient_id = ?1 AND is_deleted = 0
             ORDER BY uploaded_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![patient_id, limit as i64], |row| {
            Ok(RecordSummary {
                record_id: row.get(0)?,
                file_name: row.get(1)?,
                file_type: row.get(2)?,
                description: row.get(3)?,
                uploaded_at: row.get(4)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::*;
    use crate::store::open_memory_database;

    fn store() -> SqliteRecordStore {
        SqliteRecordStore::new(open_memory_database().unwrap())
    }

    fn sample_patient(id: Uuid) -> StoredPatient {
        StoredPatient {
            id,
            name: "Kofi Mensah".into(),
            birth_date: NaiveDate::from_ymd_opt(1968, 6, 2),
            gender: Some("male".into()),
            blood_group: Some("A+".into()),
            height: Some("175".into()),
            weight: Some("92".into()),
            egfr: Some(64.0),
            chronic_conditions: vec!["Diabetes".into(), "Hypertension".into()],
            allergies: vec!["Penicillin".into()],
            family_history: vec![],
            current_medications: vec!["Metformin".into(), "Lisinopril".into()],
        }
    }

    #[test]
    fn fetch_unknown_patient_returns_none() {
        let store = store();
        assert!(store
            .fetch_patient_profile(Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn insert_and_fetch_round_trip() {
        let store = store();
        let id = Uuid::new_v4();
        store.insert_patient(&sample_patient(id)).unwrap();

        let fetched = store.fetch_patient_profile(id).unwrap().unwrap();
        assert_eq!(fetched.name, "Kofi Mensah");
        assert_eq!(fetched.chronic_conditions.len(), 2);
        assert_eq!(fetched.allergies, vec!["Penicillin".to_string()]);
        assert_eq!(fetched.birth_date, NaiveDate::from_ymd_opt(1968, 6, 2));
    }

    #[test]
    fn recent_records_newest_first_with_limit() {
        let store = store();
        let patient_id = Uuid::new_v4();
        store.insert_patient(&sample_patient(patient_id)).unwrap();

        let base = Utc::now();
        for i in 0..7 {
            store
                .insert_record(
                    patient_id,
                    &RecordSummary {
                        record_id: Uuid::new_v4(),
                        file_name: Some(format!("report_{i}.pdf")),
                        file_type: Some("pdf".into()),
                        description: None,
                        uploaded_at: Some(base - Duration::days(i)),
                    },
                )
                .unwrap();
        }

        let records = store.fetch_recent_records(patient_id, 5).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].file_name.as_deref(), Some("report_0.pdf"));
        assert_eq!(records[4].file_name.as_deref(), Some("report_4.pdf"));
    }

    #[test]
    fn deleted_records_are_filtered() {
        let store = store();
        let patient_id = Uuid::new_v4();
        store.insert_patient(&sample_patient(patient_id)).unwrap();

        let record_id = Uuid::new_v4();
        store
            .insert_record(
                patient_id,
                &RecordSummary {
                    record_id,
                    file_name: Some("old_scan.pdf".into()),
                    file_type: Some("pdf".into()),
                    description: None,
                    uploaded_at: Some(Utc::now()),
                },
            )
            .unwrap();
        store.delete_record(record_id).unwrap();

        assert!(store.fetch_recent_records(patient_id, 5).unwrap().is_empty());
    }

    #[test]
    fn malformed_list_column_degrades_to_empty() {
        let store = store();
        let id = Uuid::new_v4();
        store.insert_patient(&sample_patient(id)).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE patients SET allergies = 'not json' WHERE id = ?1",
                params![id],
            )
            .unwrap();
        }
        let fetched = store.fetch_patient_profile(id).unwrap().unwrap();
        assert!(fetched.allergies.is_empty());
        assert_eq!(fetched.chronic_conditions.len(), 2);
    }
}
