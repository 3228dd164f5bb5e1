//! # Configuration Settings
//!
//! Defines the configuration structure for the credential vault and token
//! refresh manager.

use crate::errors::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Encryption key configuration
    pub encryption: EncryptionConfig,

    /// OAuth provider configuration
    #[validate(nested)]
    pub oauth: OAuthProviderConfig,
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database: DatabaseConfig::from_env(),
            encryption: EncryptionConfig::from_env()?,
            oauth: OAuthProviderConfig::from_env()?,
        };
        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(VaultError::from)?;
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/keywarden.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite://")
    }

    /// Create DatabaseConfig from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/keywarden.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        let connect_timeout_seconds = std::env::var("DATABASE_CONNECT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        let idle_timeout_seconds = std::env::var("DATABASE_IDLE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(600);

        let auto_migrate = std::env::var("DATABASE_AUTO_MIGRATE")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(true);

        Self {
            url,
            max_connections,
            min_connections,
            connect_timeout_seconds,
            idle_timeout_seconds,
            auto_migrate,
        }
    }
}

/// Encryption key configuration.
///
/// Holds the raw configured secret; interpretation (raw key vs. passphrase)
/// happens in `KeyProvider::resolve`, which fails fast when no usable value
/// is present.
#[derive(Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte key, or a passphrase to stretch
    #[serde(skip_serializing)]
    pub secret: String,
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig").field("secret", &"[REDACTED]").finish()
    }
}

impl EncryptionConfig {
    /// Load from `KEYWARDEN_ENCRYPTION_KEY`
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("KEYWARDEN_ENCRYPTION_KEY").map_err(|_| {
            VaultError::key_not_configured(
                "KEYWARDEN_ENCRYPTION_KEY environment variable not set. \
                 Generate a key with: openssl rand -base64 32",
            )
        })?;

        Ok(Self { secret })
    }
}

/// OAuth provider configuration (one provider per deployment)
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct OAuthProviderConfig {
    /// OAuth2 client identifier
    #[validate(length(min = 1, message = "Client ID cannot be empty"))]
    pub client_id: String,

    /// OAuth2 client secret
    #[validate(length(min = 1, message = "Client secret cannot be empty"))]
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Provider token endpoint URL
    #[validate(custom(function = "validate_token_url"))]
    pub token_url: String,

    /// Lead time before expiry at which a proactive refresh triggers
    #[validate(range(
        min = 0,
        max = 3600,
        message = "Refresh skew must be between 0 and 3600 seconds"
    ))]
    pub refresh_skew_seconds: u64,

    /// Timeout applied to every outbound provider/platform call
    #[validate(range(
        min = 1,
        max = 300,
        message = "HTTP timeout must be between 1 and 300 seconds"
    ))]
    pub http_timeout_seconds: u64,
}

impl OAuthProviderConfig {
    /// Load from `KEYWARDEN_OAUTH_*` environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("KEYWARDEN_OAUTH_CLIENT_ID").map_err(|_| {
            VaultError::config("KEYWARDEN_OAUTH_CLIENT_ID environment variable not set")
        })?;

        let client_secret = std::env::var("KEYWARDEN_OAUTH_CLIENT_SECRET").map_err(|_| {
            VaultError::config("KEYWARDEN_OAUTH_CLIENT_SECRET environment variable not set")
        })?;

        let token_url = std::env::var("KEYWARDEN_OAUTH_TOKEN_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string());

        let refresh_skew_seconds = std::env::var("KEYWARDEN_OAUTH_REFRESH_SKEW_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);

        let http_timeout_seconds = std::env::var("KEYWARDEN_OAUTH_HTTP_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        Ok(Self { client_id, client_secret, token_url, refresh_skew_seconds, http_timeout_seconds })
    }

    /// Get the refresh skew as a chrono Duration
    pub fn refresh_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_skew_seconds as i64)
    }

    /// Get the HTTP timeout as a std Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl std::fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("refresh_skew_seconds", &self.refresh_skew_seconds)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}

fn validate_token_url(value: &str) -> std::result::Result<(), ValidationError> {
    url::Url::parse(value).map_err(|_| ValidationError::new("invalid_token_url"))?;
    Ok(())
}

impl Default for OAuthProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            refresh_skew_seconds: 300,
            http_timeout_seconds: 30,
        }
    }
}
