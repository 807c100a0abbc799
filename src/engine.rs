//! The clinical decision-support engine.
//!
//! One engine instance owns the immutable knowledge and interaction
//! catalogs and the store-backed collaborators. Each call runs to
//! completion inside the caller's request; the only suspension points
//! are store I/O and the optional enrichment call, which fails open.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyzer::ContextAnalyzer;
use crate::enrichment::{Enrichment, EnrichmentError};
use crate::error::CdsError;
use crate::interaction::{InteractionCatalog, InteractionChecker};
use crate::knowledge::{self, Guideline, KnowledgeCatalog};
use crate::learning::LearningSystem;
use crate::models::enums::{
    AlertKind, ContextTrigger, PathwayKind, RiskSeverity, SuggestionType, TriggerType,
};
use crate::models::{
    CarePathwayStep, CaseContext, CriticalAlert, DiagnosisCandidate, Demographics, DosingGuidance,
    MedicalHistory, PatientContext, SafetyReport, SessionInput, SuggestionBundle, Vitals,
};
use crate::store::{PreferenceStore, RecordStore};

/// Feedback as the calling layer submits it, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub operator_id: Uuid,
    pub suggestion_id: Option<Uuid>,
    pub suggestion_type: String,
    pub content: serde_json::Value,
    pub action: String,
    pub reason: Option<String>,
}

pub struct CdsEngine {
    analyzer: ContextAnalyzer,
    knowledge: Arc<KnowledgeCatalog>,
    checker: InteractionChecker,
    learning: LearningSystem,
    enrichment: Option<Arc<dyn Enrichment>>,
}

impl CdsEngine {
    /// Engine over the bundled catalogs, enrichment disabled.
    pub fn new(records: Arc<dyn RecordStore>, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            analyzer: ContextAnalyzer::new(records),
            knowledge: Arc::new(KnowledgeCatalog::bundled()),
            checker: InteractionChecker::new(Arc::new(InteractionCatalog::bundled())),
            learning: LearningSystem::new(preferences),
            enrichment: None,
        }
    }

    /// Attach an enrichment collaborator. Best-effort: every failure
    /// degrades to "no annotation".
    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    pub fn analyzer(&self) -> &ContextAnalyzer {
        &self.analyzer
    }

    pub fn learning(&self) -> &LearningSystem {
        &self.learning
    }

    /// Main entry point: analyze a patient in the current session and
    /// assemble the full suggestion bundle.
    pub fn analyze_and_suggest(
        &self,
        patient_id: Uuid,
        operator_id: Uuid,
        session: &SessionInput,
        trigger: TriggerType,
    ) -> Result<SuggestionBundle, CdsError> {
        tracing::info!(
            patient_id = %patient_id,
            operator_id = %operator_id,
            trigger = trigger.as_str(),
            "CDS analysis started"
        );

        let patient = self.analyzer.analyze(patient_id)?;
        let changes = self.analyzer.detect_context_changes(session);
        let case = merge_session(patient, session);

        let mut bundle = SuggestionBundle {
            generated_at: Utc::now(),
            patient_id,
            trigger,
            differential_diagnosis: Vec::new(),
            medication_recommendations: Vec::new(),
            care_pathway: Vec::new(),
            alerts: Vec::new(),
            risk_factors: case.patient.risk_factors.clone(),
        };

        if changes.contains(&ContextTrigger::NewSymptoms)
            || changes.contains(&ContextTrigger::DiagnosisFieldActive)
            || trigger == TriggerType::DiagnosisField
        {
            let ddx = knowledge::differential_diagnosis(
                &self.knowledge,
                &case.symptoms,
                &case.patient,
            );
            let mut ddx = self.learning.filter_suggestions(
                operator_id,
                ddx,
                SuggestionType::DifferentialDiagnosis,
            )?;
            // Annotation only: opaque text on the lead candidate, never
            // affecting membership or order.
            if let Some(top) = ddx.first_mut() {
                top.ai_annotation = self.annotate(|service| {
                    service.enhance_differential_diagnosis(
                        &case.symptoms.join(", "),
                        &case.patient.summary(),
                    )
                });
            }
            bundle.differential_diagnosis = ddx;
        }

        if case.working_diagnosis.is_some()
            || changes.contains(&ContextTrigger::PrescriptionFieldActive)
            || trigger == TriggerType::PrescriptionField
        {
            let condition = case
                .working_diagnosis
                .clone()
                .or_else(|| case.patient.history.chronic_conditions.first().cloned());

            if let Some(condition) = condition {
                let mut recommendations = knowledge::medication_recommendations(
                    &self.knowledge,
                    &self.checker,
                    &condition,
                    &case.patient,
                );
                for recommendation in &mut recommendations {
                    recommendation.safety = Some(self.checker.check_all(
                        &recommendation.drug,
                        &case.patient.current_medications,
                        &case.patient.history.allergies,
                        &case.patient.history.chronic_conditions,
                        case.patient.renal_function,
                    ));
                }
                bundle.medication_recommendations = self.learning.filter_suggestions(
                    operator_id,
                    recommendations,
                    SuggestionType::Medication,
                )?;
            }
        }

        bundle.care_pathway = care_pathway(&case.patient);
        bundle.alerts = critical_alerts(&case.patient);

        tracing::info!(
            patient_id = %patient_id,
            diagnoses = bundle.differential_diagnosis.len(),
            medications = bundle.medication_recommendations.len(),
            pathway_steps = bundle.care_pathway.len(),
            alerts = bundle.alerts.len(),
            "CDS analysis complete"
        );
        Ok(bundle)
    }

    /// Safety check for one proposed medication against the stored
    /// patient context.
    pub fn check_medication_safety(
        &self,
        patient_id: Uuid,
        medication: &str,
        dose: Option<&str>,
    ) -> Result<SafetyReport, CdsError> {
        if medication.trim().is_empty() {
            return Err(CdsError::Validation("medication is required".into()));
        }

        let ctx = self.analyzer.analyze(patient_id)?;
        let mut report = self.checker.check_all(
            medication,
            &ctx.current_medications,
            &ctx.history.allergies,
            &ctx.history.chronic_conditions,
            ctx.renal_function,
        );

        report.ai_assessment = self.annotate(|service| {
            let summary = match dose {
                Some(dose) => format!("{} Proposed dose: {dose}.", ctx.summary()),
                None => ctx.summary(),
            };
            service.medication_safety_text(medication, &summary)
        });
        report.dosing = Some(dosing_guidance(medication, &ctx));

        Ok(report)
    }

    /// Direct differential-diagnosis entry point.
    /// Symptoms are required; patient context is optional.
    pub fn differential_diagnosis(
        &self,
        operator_id: Uuid,
        symptoms: &[String],
        patient_id: Option<Uuid>,
    ) -> Result<Vec<DiagnosisCandidate>, CdsError> {
        if symptoms.is_empty() {
            return Err(CdsError::Validation("symptoms are required".into()));
        }

        let ctx = match patient_id {
            Some(id) => self.analyzer.analyze(id)?,
            None => anonymous_context(),
        };
        let ddx = knowledge::differential_diagnosis(&self.knowledge, symptoms, &ctx);
        self.learning
            .filter_suggestions(operator_id, ddx, SuggestionType::DifferentialDiagnosis)
    }

    /// Enrichment-backed prose treatment plan. `None` whenever the
    /// collaborator is disabled or unreachable.
    pub fn treatment_plan(
        &self,
        patient_id: Uuid,
        session: &SessionInput,
    ) -> Result<Option<String>, CdsError> {
        let ctx = self.analyzer.analyze(patient_id)?;

        let mut summary = ctx.summary();
        if !session.symptoms.is_empty() {
            summary.push_str(&format!(" Presenting symptoms: {}.", session.symptoms.join(", ")));
        }
        if let Some(diagnosis) = &session.diagnosis {
            summary.push_str(&format!(" Working diagnosis: {diagnosis}."));
        }

        Ok(self.annotate(|service| service.treatment_plan_text(&summary)))
    }

    /// Validate and record one feedback submission.
    pub fn record_feedback(&self, submission: FeedbackSubmission) -> Result<(), CdsError> {
        let suggestion_type: SuggestionType =
            submission.suggestion_type.parse().map_err(|_| {
                CdsError::Validation(format!(
                    "invalid suggestion type: {}",
                    submission.suggestion_type
                ))
            })?;
        let action: crate::models::enums::FeedbackAction = submission
            .action
            .parse()
            .map_err(|_| CdsError::Validation(format!("invalid action: {}", submission.action)))?;
        if !submission.content.is_object() {
            return Err(CdsError::Validation(
                "suggestion content must be an object".into(),
            ));
        }

        tracing::debug!(
            operator_id = %submission.operator_id,
            suggestion_id = ?submission.suggestion_id,
            "Feedback submission accepted"
        );
        self.learning.record_feedback(
            submission.operator_id,
            suggestion_type,
            submission.content,
            action,
            submission.reason,
        )
    }

    pub fn guideline(&self, topic: &str) -> Result<&Guideline, CdsError> {
        self.knowledge
            .guideline(topic)
            .ok_or_else(|| CdsError::GuidelineNotFound(topic.to_string()))
    }

    /// Run an enrichment call, degrading every failure to `None`.
    fn annotate<F>(&self, call: F) -> Option<String>
    where
        F: FnOnce(&dyn Enrichment) -> Result<String, EnrichmentError>,
    {
        let service = self.enrichment.as_ref()?;
        match call(service.as_ref()) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Enrichment unavailable, continuing without annotation");
                None
            }
        }
    }
}

/// Merge live session input over the stored context.
/// Session values win; stored values are never written back.
fn merge_session(patient: PatientContext, session: &SessionInput) -> CaseContext {
    CaseContext {
        patient,
        symptoms: session.symptoms.clone(),
        working_diagnosis: session.diagnosis.clone(),
        session_vitals: session.vitals.clone(),
    }
}

/// Context stand-in for calls without a patient id.
fn anonymous_context() -> PatientContext {
    PatientContext {
        patient_id: Uuid::nil(),
        demographics: Demographics::default(),
        vitals: Vitals::default(),
        history: MedicalHistory::default(),
        current_medications: Vec::new(),
        renal_function: None,
        risk_factors: Vec::new(),
        recent_records: Vec::new(),
        generated_at: Utc::now(),
    }
}

/// Deterministic care-pathway rules keyed by chronic conditions and
/// risk factors.
fn care_pathway(ctx: &PatientContext) -> Vec<CarePathwayStep> {
    let mut pathway = Vec::new();

    if ctx.has_condition("Diabetes") {
        pathway.push(CarePathwayStep {
            kind: PathwayKind::LabTest,
            recommendation: "HbA1c".into(),
            frequency: Some("Every 3 months".into()),
            urgency: None,
            rationale: "Monitor glycemic control".into(),
            citation: Some("ADA Standards of Care 2024".into()),
        });
        pathway.push(CarePathwayStep {
            kind: PathwayKind::LabTest,
            recommendation: "Lipid Panel".into(),
            frequency: Some("Annually".into()),
            urgency: None,
            rationale: "Cardiovascular risk assessment".into(),
            citation: Some("ADA Standards of Care 2024".into()),
        });
    }

    if ctx.has_condition("Hypertension") {
        pathway.push(CarePathwayStep {
            kind: PathwayKind::Monitoring,
            recommendation: "Blood Pressure Monitoring".into(),
            frequency: Some("Every visit".into()),
            urgency: None,
            rationale: "Assess treatment efficacy".into(),
            citation: Some("ACC/AHA Guidelines".into()),
        });
    }

    for risk in &ctx.risk_factors {
        if risk.severity == RiskSeverity::High && risk.factor.contains("Diabetes") {
            pathway.push(CarePathwayStep {
                kind: PathwayKind::Referral,
                recommendation: "Endocrinology Consultation".into(),
                frequency: None,
                urgency: Some("routine".into()),
                rationale: "Complex diabetes management".into(),
                citation: None,
            });
        }
    }

    pathway
}

/// Critical alerts: high-severity risks, missing data, and age-based
/// preventive-care reminders.
fn critical_alerts(ctx: &PatientContext) -> Vec<CriticalAlert> {
    let mut alerts = Vec::new();

    for risk in &ctx.risk_factors {
        if risk.severity == RiskSeverity::High {
            alerts.push(CriticalAlert {
                kind: AlertKind::RiskAlert,
                severity: RiskSeverity::High,
                message: format!("High Risk: {}", risk.factor),
                description: Some(risk.description.clone()),
                action_required: true,
                suggested_action: None,
                citation: None,
            });
        }
    }

    if ctx.history.allergies.is_empty() {
        alerts.push(CriticalAlert {
            kind: AlertKind::MissingInfo,
            severity: RiskSeverity::Moderate,
            message: "Allergy information not documented".into(),
            description: None,
            action_required: true,
            suggested_action: Some("Update patient allergies".into()),
            citation: None,
        });
    }

    if ctx.demographics.age.is_some_and(|age| age > 45) {
        alerts.push(CriticalAlert {
            kind: AlertKind::PreventiveCare,
            severity: RiskSeverity::Low,
            message: "Consider diabetes screening".into(),
            description: Some("Age >45 years".into()),
            action_required: false,
            suggested_action: None,
            citation: Some("ADA Screening Guidelines".into()),
        });
    }

    alerts
}

/// Standard dosing guide for commonly recommended drugs, with
/// age-driven adjustment notes.
fn dosing_guidance(medication: &str, ctx: &PatientContext) -> DosingGuidance {
    let mut guidance = match medication.to_lowercase().as_str() {
        "metformin" => DosingGuidance {
            standard_dose: Some("500mg twice daily, titrate to 1000mg twice daily".into()),
            max_dose: Some("2000mg daily".into()),
            administration: Some("Take with meals to reduce GI side effects".into()),
            adjustments: Vec::new(),
        },
        "lisinopril" => DosingGuidance {
            standard_dose: Some("10mg once daily".into()),
            max_dose: Some("40mg daily".into()),
            administration: Some("Can be taken with or without food".into()),
            adjustments: Vec::new(),
        },
        _ => DosingGuidance::default(),
    };

    if ctx.demographics.age.is_some_and(|age| age > 65) {
        guidance
            .adjustments
            .push("Consider lower starting dose in elderly patients".into());
    }

    guidance
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use crate::enrichment::MockEnrichment;
    use crate::models::enums::DiagnosisSeverity;
    use crate::models::StoredPatient;
    use crate::store::{
        open_memory_database, SqlitePreferenceStore, SqliteRecordStore,
    };

    fn birth_date_for_age(age: i64) -> chrono::NaiveDate {
        Utc::now().date_naive() - Duration::days(365 * age + 40)
    }

    fn sample_patient(id: Uuid) -> StoredPatient {
        StoredPatient {
            id,
            name: "Yaw Darko".into(),
            birth_date: Some(birth_date_for_age(58)),
            gender: Some("male".into()),
            blood_group: Some("O+".into()),
            height: Some("172".into()),
            weight: Some("80".into()),
            egfr: None,
            chronic_conditions: vec!["Diabetes".into(), "Hypertension".into()],
            allergies: vec!["Penicillin".into()],
            family_history: vec![],
            current_medications: vec!["Aspirin".into()],
        }
    }

    fn engine_with(patient: Option<StoredPatient>) -> CdsEngine {
        let records = Arc::new(SqliteRecordStore::new(open_memory_database().unwrap()));
        if let Some(patient) = patient {
            records.insert_patient(&patient).unwrap();
        }
        let prefs = Arc::new(SqlitePreferenceStore::new(open_memory_database().unwrap()));
        CdsEngine::new(records, prefs)
    }

    fn symptoms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_patient_fails_fast() {
        let engine = engine_with(None);
        let missing = Uuid::new_v4();
        let result = engine.analyze_and_suggest(
            missing,
            Uuid::new_v4(),
            &SessionInput::default(),
            TriggerType::Passive,
        );
        match result {
            Err(CdsError::PatientNotFound(id)) => assert_eq!(id, missing),
            other => panic!("Expected PatientNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn passive_trigger_without_symptoms_skips_generation_stages() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        let bundle = engine
            .analyze_and_suggest(
                patient_id,
                Uuid::new_v4(),
                &SessionInput::default(),
                TriggerType::Passive,
            )
            .unwrap();

        assert!(bundle.differential_diagnosis.is_empty());
        assert!(bundle.medication_recommendations.is_empty());
        // Pathway and alerts always generate.
        assert!(!bundle.care_pathway.is_empty());
        assert!(!bundle.alerts.is_empty());
        assert!(!bundle.risk_factors.is_empty());
    }

    #[test]
    fn symptoms_drive_ranked_differential() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        let session = SessionInput {
            symptoms: symptoms(&["chest_pain", "dyspnea"]),
            ..Default::default()
        };
        let bundle = engine
            .analyze_and_suggest(patient_id, Uuid::new_v4(), &session, TriggerType::Passive)
            .unwrap();

        let top = &bundle.differential_diagnosis[0];
        assert_eq!(top.diagnosis, "Acute Coronary Syndrome");
        assert_eq!(top.confidence, 83.3);
        assert_eq!(top.severity, DiagnosisSeverity::Critical);
        assert!(top.ai_annotation.is_none());
    }

    #[test]
    fn prescription_trigger_falls_back_to_first_chronic_condition() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        let bundle = engine
            .analyze_and_suggest(
                patient_id,
                Uuid::new_v4(),
                &SessionInput::default(),
                TriggerType::PrescriptionField,
            )
            .unwrap();

        // First chronic condition is Diabetes; Metformin survives and
        // carries a full safety report.
        let metformin = bundle
            .medication_recommendations
            .iter()
            .find(|m| m.drug == "Metformin")
            .expect("metformin recommended");
        let safety = metformin.safety.as_ref().unwrap();
        assert_eq!(safety.medication, "Metformin");
        assert!(safety.safe_to_prescribe);
    }

    #[test]
    fn active_prescription_field_drives_medication_stage() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        let session = SessionInput {
            active_field: Some(crate::models::enums::ActiveField::Prescription),
            ..Default::default()
        };
        let bundle = engine
            .analyze_and_suggest(patient_id, Uuid::new_v4(), &session, TriggerType::Passive)
            .unwrap();

        assert!(!bundle.medication_recommendations.is_empty());
        assert!(bundle.differential_diagnosis.is_empty());
    }

    #[test]
    fn session_diagnosis_overrides_chronic_condition_fallback() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        let session = SessionInput {
            diagnosis: Some("hypertension".into()),
            ..Default::default()
        };
        let bundle = engine
            .analyze_and_suggest(patient_id, Uuid::new_v4(), &session, TriggerType::Passive)
            .unwrap();

        let drugs: Vec<_> = bundle
            .medication_recommendations
            .iter()
            .map(|m| m.drug.as_str())
            .collect();
        assert!(drugs.contains(&"Amlodipine"));
        assert!(drugs.contains(&"Lisinopril"));
        assert!(!drugs.contains(&"Metformin"));
    }

    #[test]
    fn care_pathway_and_alerts_for_diabetic_hypertensive() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        let bundle = engine
            .analyze_and_suggest(
                patient_id,
                Uuid::new_v4(),
                &SessionInput::default(),
                TriggerType::Passive,
            )
            .unwrap();

        let recommendations: Vec<_> = bundle
            .care_pathway
            .iter()
            .map(|s| s.recommendation.as_str())
            .collect();
        assert!(recommendations.contains(&"HbA1c"));
        assert!(recommendations.contains(&"Lipid Panel"));
        assert!(recommendations.contains(&"Blood Pressure Monitoring"));
        assert!(recommendations.contains(&"Endocrinology Consultation"));

        // High-risk alerts for both conditions, plus the age-based
        // screening reminder; allergies are documented so no missing-info.
        let messages: Vec<_> = bundle.alerts.iter().map(|a| a.message.as_str()).collect();
        assert!(messages.contains(&"High Risk: Diabetes"));
        assert!(messages.contains(&"High Risk: Hypertension"));
        assert!(messages.contains(&"Consider diabetes screening"));
        assert!(!messages.contains(&"Allergy information not documented"));
    }

    #[test]
    fn missing_allergy_data_raises_alert() {
        let patient_id = Uuid::new_v4();
        let mut patient = sample_patient(patient_id);
        patient.allergies = vec![];
        let engine = engine_with(Some(patient));

        let bundle = engine
            .analyze_and_suggest(
                patient_id,
                Uuid::new_v4(),
                &SessionInput::default(),
                TriggerType::Passive,
            )
            .unwrap();

        let missing = bundle
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::MissingInfo)
            .unwrap();
        assert_eq!(missing.severity, RiskSeverity::Moderate);
        assert_eq!(
            missing.suggested_action.as_deref(),
            Some("Update patient allergies")
        );
    }

    #[test]
    fn enrichment_annotates_top_candidate_only() {
        let patient_id = Uuid::new_v4();
        let records = Arc::new(SqliteRecordStore::new(open_memory_database().unwrap()));
        records.insert_patient(&sample_patient(patient_id)).unwrap();
        let prefs = Arc::new(SqlitePreferenceStore::new(open_memory_database().unwrap()));
        let engine = CdsEngine::new(records, prefs)
            .with_enrichment(Arc::new(MockEnrichment::returning("urgent rule-out: ACS")));

        let session = SessionInput {
            symptoms: symptoms(&["chest_pain", "dyspnea"]),
            ..Default::default()
        };
        let bundle = engine
            .analyze_and_suggest(patient_id, Uuid::new_v4(), &session, TriggerType::Passive)
            .unwrap();

        assert_eq!(
            bundle.differential_diagnosis[0].ai_annotation.as_deref(),
            Some("urgent rule-out: ACS")
        );
        for candidate in &bundle.differential_diagnosis[1..] {
            assert!(candidate.ai_annotation.is_none());
        }
    }

    #[test]
    fn enrichment_failure_is_fail_open() {
        let patient_id = Uuid::new_v4();
        let records = Arc::new(SqliteRecordStore::new(open_memory_database().unwrap()));
        records.insert_patient(&sample_patient(patient_id)).unwrap();
        let prefs = Arc::new(SqlitePreferenceStore::new(open_memory_database().unwrap()));
        let engine = CdsEngine::new(records, prefs)
            .with_enrichment(Arc::new(MockEnrichment::failing()));

        let session = SessionInput {
            symptoms: symptoms(&["chest_pain"]),
            ..Default::default()
        };
        let bundle = engine
            .analyze_and_suggest(patient_id, Uuid::new_v4(), &session, TriggerType::Passive)
            .unwrap();

        assert!(!bundle.differential_diagnosis.is_empty());
        assert!(bundle.differential_diagnosis[0].ai_annotation.is_none());

        let plan = engine
            .treatment_plan(patient_id, &SessionInput::default())
            .unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn medication_safety_uses_stored_context() {
        let patient_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        // Patient takes aspirin: warfarin must be flagged.
        let report = engine
            .check_medication_safety(patient_id, "Warfarin", None)
            .unwrap();
        assert!(!report.safe_to_prescribe);
        assert_eq!(report.drug_drug.len(), 1);

        // Penicillin allergy blocks amoxicillin by cross-sensitivity.
        let report = engine
            .check_medication_safety(patient_id, "Amoxicillin", None)
            .unwrap();
        assert!(!report.safe_to_prescribe);
        assert!(!report.allergy.is_empty());
    }

    #[test]
    fn medication_safety_includes_elderly_dosing_note() {
        let patient_id = Uuid::new_v4();
        let mut patient = sample_patient(patient_id);
        patient.birth_date = Some(birth_date_for_age(72));
        patient.current_medications = vec![];
        let engine = engine_with(Some(patient));

        let report = engine
            .check_medication_safety(patient_id, "Lisinopril", Some("10mg"))
            .unwrap();
        let dosing = report.dosing.unwrap();
        assert_eq!(dosing.standard_dose.as_deref(), Some("10mg once daily"));
        assert!(dosing
            .adjustments
            .iter()
            .any(|a| a.contains("elderly")));
    }

    #[test]
    fn empty_medication_name_is_rejected() {
        let engine = engine_with(None);
        match engine.check_medication_safety(Uuid::new_v4(), "  ", None) {
            Err(CdsError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn direct_ddx_requires_symptoms() {
        let engine = engine_with(None);
        match engine.differential_diagnosis(Uuid::new_v4(), &[], None) {
            Err(CdsError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn direct_ddx_works_without_patient_context() {
        let engine = engine_with(None);
        let result = engine
            .differential_diagnosis(Uuid::new_v4(), &symptoms(&["fever"]), None)
            .unwrap();
        assert!(result
            .iter()
            .any(|c| c.diagnosis == "Viral Upper Respiratory Infection"));
    }

    #[test]
    fn repeated_dismissals_suppress_suggestion_in_bundle() {
        let patient_id = Uuid::new_v4();
        let operator_id = Uuid::new_v4();
        let engine = engine_with(Some(sample_patient(patient_id)));

        for _ in 0..4 {
            engine
                .record_feedback(FeedbackSubmission {
                    operator_id,
                    suggestion_id: Some(Uuid::new_v4()),
                    suggestion_type: "differential_diagnosis".into(),
                    content: json!({"diagnosis": "Gastroesophageal Reflux Disease"}),
                    action: "dismissed".into(),
                    reason: Some("atypical presentation".into()),
                })
                .unwrap();
        }

        let session = SessionInput {
            symptoms: symptoms(&["chest_pain"]),
            ..Default::default()
        };
        let bundle = engine
            .analyze_and_suggest(patient_id, operator_id, &session, TriggerType::Passive)
            .unwrap();

        assert!(bundle
            .differential_diagnosis
            .iter()
            .all(|c| c.diagnosis != "Gastroesophageal Reflux Disease"));

        // A different operator still sees it.
        let other = engine
            .analyze_and_suggest(patient_id, Uuid::new_v4(), &session, TriggerType::Passive)
            .unwrap();
        assert!(other
            .differential_diagnosis
            .iter()
            .any(|c| c.diagnosis == "Gastroesophageal Reflux Disease"));
    }

    #[test]
    fn invalid_feedback_fields_are_rejected() {
        let engine = engine_with(None);

        let submission = FeedbackSubmission {
            operator_id: Uuid::new_v4(),
            suggestion_id: None,
            suggestion_type: "horoscope".into(),
            content: json!({"diagnosis": "GERD"}),
            action: "dismissed".into(),
            reason: None,
        };
        assert!(matches!(
            engine.record_feedback(submission),
            Err(CdsError::Validation(_))
        ));

        let submission = FeedbackSubmission {
            operator_id: Uuid::new_v4(),
            suggestion_id: None,
            suggestion_type: "medication".into(),
            content: json!("not an object"),
            action: "accepted".into(),
            reason: None,
        };
        assert!(matches!(
            engine.record_feedback(submission),
            Err(CdsError::Validation(_))
        ));
    }

    #[test]
    fn guideline_lookup_and_not_found() {
        let engine = engine_with(None);
        assert_eq!(
            engine.guideline("hypertension_management").unwrap().source,
            "ACC/AHA 2017"
        );
        assert!(matches!(
            engine.guideline("unknown_topic"),
            Err(CdsError::GuidelineNotFound(_))
        ));
    }
}
