//! Error types shared by every layer of the crate.

use thiserror::Error;

/// All errors that can occur while generating, applying or restoring identifiers.
#[derive(Debug, Error)]
pub enum PoserError {
    /// The identifier did not contain exactly 12 hex digits.
    #[error("Invalid MAC format: {0}")]
    InvalidFormat(String),

    /// No adapter with the given display name exists.
    #[error("Adapter not found: {0}")]
    AdapterNotFound(String),

    /// The adapter exists but its persistent configuration entry does not.
    #[error("Adapter configuration key not found for '{adapter}' (correlation id: {correlation_id})")]
    ConfigKeyNotFound {
        adapter: String,
        correlation_id: String,
    },

    /// Elevation was declined or is unavailable on this host.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The external configuration agent failed or produced unusable output.
    #[error("Configuration agent failed: {0}")]
    ExternalAgentFailure(String),

    /// A profile id was requested that does not exist in the store.
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// The configuration file could not be read, parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoserError {
    /// Agent-boundary failures may succeed when the caller tries again;
    /// validation and local errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PoserError::AdapterNotFound(_)
                | PoserError::ConfigKeyNotFound { .. }
                | PoserError::PermissionDenied(_)
                | PoserError::ExternalAgentFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_key_message_names_correlation_id() {
        let e = PoserError::ConfigKeyNotFound {
            adapter: "Wi-Fi".to_string(),
            correlation_id: "{1234}".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Wi-Fi"));
        assert!(msg.contains("{1234}"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PoserError::PermissionDenied("declined".into()).is_retryable());
        assert!(PoserError::ExternalAgentFailure("exit 1".into()).is_retryable());
        assert!(!PoserError::InvalidFormat("AA".into()).is_retryable());
        assert!(!PoserError::ProfileNotFound("x".into()).is_retryable());
    }
}
