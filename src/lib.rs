//! Axon — a deterministic clinical decision-support core.
//!
//! Given a patient's aggregated clinical context and an in-session
//! action, Axon produces ranked differential-diagnosis candidates,
//! medication recommendations with safety screening, a care pathway and
//! alerts, then narrows the output with a per-operator preference
//! profile learned from accept/dismiss feedback.
//!
//! The transport layer, identity, record storage and the generative-text
//! enrichment service are external collaborators behind the traits in
//! [`store`] and [`enrichment`].

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod interaction;
pub mod knowledge;
pub mod learning;
pub mod models;
pub mod store;

pub use engine::{CdsEngine, FeedbackSubmission};
pub use error::CdsError;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedders and integration tests.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
    }
}
