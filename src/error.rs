use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors that abort a request.
///
/// Everything else degrades: partial context derivations substitute
/// defaults and the enrichment collaborator fails open.
#[derive(Error, Debug)]
pub enum CdsError {
    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Guideline not found: {0}")]
    GuidelineNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Record or preference store unavailable. Surfaced as-is; retry
    /// policy, if any, belongs to the store adapter.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
