//! Error types for the conditions pipeline

use thiserror::Error;

/// Request-level failures surfaced to callers
#[derive(Debug, Error)]
pub enum SurfError {
    /// Every adapter failed or returned nothing
    #[error("all {attempted} sources failed for {location_id} ({failed} failed, {empty} empty)")]
    AllSourcesFailed {
        location_id: String,
        attempted: usize,
        failed: usize,
        empty: usize,
    },

    /// No spot profile is registered for the location
    #[error("no spot profile registered for location {0}")]
    InvalidProfile(String),
}

/// Failure of a single provider adapter; recovered by the orchestrator
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {source_id} failed: {error}")]
    Http {
        source_id: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{source_id} returned HTTP {status}")]
    Status { source_id: String, status: u16 },

    #[error("could not decode {source_id} response: {message}")]
    Decode { source_id: String, message: String },

    #[error("{source_id} timed out")]
    Timeout { source_id: String },

    #[error("{source_id} adapter panicked: {message}")]
    Panicked { source_id: String, message: String },
}

impl ProviderError {
    pub fn http(source_id: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout {
                source_id: source_id.to_string(),
            }
        } else {
            ProviderError::Http {
                source_id: source_id.to_string(),
                error,
            }
        }
    }

    pub fn decode(source_id: &str, message: impl Into<String>) -> Self {
        ProviderError::Decode {
            source_id: source_id.to_string(),
            message: message.into(),
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Http { .. } => "http",
            ProviderError::Status { .. } => "status",
            ProviderError::Decode { .. } => "decode",
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Panicked { .. } => "panicked",
        }
    }
}

pub type Result<T> = std::result::Result<T, SurfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sources_failed_message() {
        let err = SurfError::AllSourcesFailed {
            location_id: "pipeline".to_string(),
            attempted: 3,
            failed: 2,
            empty: 1,
        };
        assert_eq!(
            err.to_string(),
            "all 3 sources failed for pipeline (2 failed, 1 empty)"
        );
    }

    #[test]
    fn test_invalid_profile_names_location() {
        let err = SurfError::InvalidProfile("atlantis".to_string());
        assert_eq!(
            err.to_string(),
            "no spot profile registered for location atlantis"
        );
    }

    #[test]
    fn test_provider_error_kind() {
        let err = ProviderError::decode("open-meteo-marine", "missing hourly.time");
        assert_eq!(err.kind(), "decode");
        assert!(err.to_string().contains("missing hourly.time"));
    }
}
