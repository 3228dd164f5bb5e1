//! # Keywarden
//!
//! Keywarden is an encrypted credential vault and OAuth2 token lifecycle
//! manager for multi-tenant integrations. It encrypts third-party platform
//! secrets (CMS passwords, FTP/SSH keys, API and deploy tokens) per tenant
//! and platform, and keeps OAuth2 access tokens for long-lived integrations
//! valid by refreshing them transparently before expiry or on authorization
//! failure.
//!
//! ## Architecture
//!
//! ```text
//! Route Layer (external) → CredentialVault ─┬→ Cipher ← KeyProvider
//!                        → TokenRefreshManager ─┘    ↓
//!                                  ↓            Storage (sqlx)
//!                              AuditLog
//! ```
//!
//! ## Core Components
//!
//! - **Cipher / KeyProvider**: AES-256-GCM authenticated encryption behind a
//!   trait, master key resolved once at startup (fail-fast when absent)
//! - **CredentialVault**: per-(tenant, platform) credential records with
//!   sensitive-field classification, masked fetch, and audited reveal
//! - **TokenRefreshManager**: proactive and reactive OAuth2 refresh with
//!   single-flight serialization per integration id
//! - **AuditLog**: append-only record of credential and token activity
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use keywarden::config::AppConfig;
//! use keywarden::crypto::{AesGcmCipher, KeyProvider};
//! use keywarden::oauth::{TokenEndpointClient, TokenRefreshManager};
//! use keywarden::storage::{self, SqlxAuditLog, SqlxCredentialStore, SqlxIntegrationStore};
//! use keywarden::vault::CredentialVault;
//! use keywarden::Result;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!
//!     let master_key = KeyProvider::resolve(&config.encryption)?;
//!     let cipher = Arc::new(AesGcmCipher::new(master_key));
//!
//!     let pool = storage::create_pool(&config.database).await?;
//!     let audit = Arc::new(SqlxAuditLog::new(pool.clone()));
//!
//!     let vault = CredentialVault::new(
//!         Arc::new(SqlxCredentialStore::new(pool.clone())),
//!         audit.clone(),
//!         cipher.clone(),
//!     );
//!
//!     let tokens = TokenRefreshManager::new(
//!         Arc::new(SqlxIntegrationStore::new(pool)),
//!         audit,
//!         cipher,
//!         TokenEndpointClient::new(config.oauth.clone())?,
//!         config.oauth.refresh_skew(),
//!     );
//!
//!     let _ = (vault, tokens);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod domain;
pub mod errors;
pub mod oauth;
pub mod observability;
pub mod storage;
pub mod vault;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{Result, VaultError};
pub use observability::init_tracing;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "keywarden");
    }
}
