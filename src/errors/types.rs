//! # Error Types
//!
//! Error taxonomy for vault and token-lifecycle operations using `thiserror`.

/// Custom result type for keywarden operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for the credential vault and token refresh manager
#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No usable encryption key is configured. Fatal at startup: the vault
    /// refuses to serve credential operations rather than fall back to an
    /// ephemeral key that would strand every stored secret on restart.
    #[error("Encryption key not configured: {0}")]
    KeyNotConfigured(String),

    /// Validation errors (bad input shape, unknown platform or field)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Authenticated decryption failed. Carries no cause detail: tampering,
    /// a wrong key, and a truncated blob must be indistinguishable to the
    /// caller.
    #[error("Decryption failed: ciphertext authentication error")]
    Authentication,

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound {
        resource_type: String,
        id: String,
    },

    /// Transient provider failure (network, timeout, 5xx). Stored token
    /// state is left untouched; safe to retry.
    #[error("Provider request failed: {message}")]
    ProviderTransient { message: String },

    /// The provider rejected the grant itself; the integration requires a
    /// fresh end-user authorization. Never retried automatically.
    #[error("Re-authorization required: {message}")]
    ProviderAuth { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VaultError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a missing-key error
    pub fn key_not_configured<S: Into<String>>(message: S) -> Self {
        Self::KeyNotConfigured(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a transient provider error
    pub fn provider_transient<S: Into<String>>(message: S) -> Self {
        Self::ProviderTransient { message: message.into() }
    }

    /// Create a provider authorization error
    pub fn provider_auth<S: Into<String>>(message: S) -> Self {
        Self::ProviderAuth { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if this error is safe to retry without operator intervention
    pub fn is_retryable(&self) -> bool {
        matches!(self, VaultError::Database { .. } | VaultError::ProviderTransient { .. })
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for VaultError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(error: reqwest::Error) -> Self {
        // Outbound HTTP only targets the OAuth provider and wrapped platform
        // endpoints; transport-level failures (including timeouts) are
        // transient by contract.
        Self::ProviderTransient { message: error.to_string() }
    }
}

impl From<validator::ValidationErrors> for VaultError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = VaultError::config("Test configuration error");
        assert!(matches!(error, VaultError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error_field() {
        let error = VaultError::validation_field("Unknown field", "ftp_password");
        if let VaultError::Validation { field, .. } = error {
            assert_eq!(field, Some("ftp_password".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_authentication_error_is_opaque() {
        // The message must not vary with the failure cause.
        let error = VaultError::Authentication;
        assert_eq!(error.to_string(), "Decryption failed: ciphertext authentication error");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(VaultError::provider_transient("connection reset").is_retryable());
        assert!(!VaultError::provider_auth("invalid_grant").is_retryable());
        assert!(!VaultError::validation("bad platform").is_retryable());
        assert!(!VaultError::Authentication.is_retryable());
        assert!(!VaultError::key_not_configured("missing").is_retryable());
    }

    #[test]
    fn test_serde_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error: VaultError = json_error.into();
        assert!(matches!(error, VaultError::Serialization { .. }));
    }
}
