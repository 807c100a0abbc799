/// Application-level constants
pub const APP_NAME: &str = "Axon";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> &'static str {
    "info,axon=debug"
}

/// Configuration for the optional generative-text enrichment service.
///
/// Absent configuration means enrichment is disabled; the pipeline runs
/// identically without it.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl EnrichmentConfig {
    /// Enrichment is best-effort; a short timeout keeps it from
    /// stalling a synchronous request.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 8;
    pub const DEFAULT_MODEL: &'static str = "medgemma:4b";

    /// Read configuration from the environment.
    ///
    /// Returns `None` (enrichment disabled) when AXON_ENRICHMENT_URL is
    /// unset.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("AXON_ENRICHMENT_URL").ok()?;
        let model = std::env::var("AXON_ENRICHMENT_MODEL")
            .unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("AXON_ENRICHMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        Some(Self {
            base_url,
            model,
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_axon() {
        assert_eq!(APP_NAME, "Axon");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.4.0");
    }

    #[test]
    fn default_timeout_is_short() {
        assert!(EnrichmentConfig::DEFAULT_TIMEOUT_SECS <= 10);
    }
}
