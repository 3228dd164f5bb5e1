//! # Configuration Management
//!
//! Env-driven configuration for the vault. Each section has a `from_env()`
//! constructor and is validated with the `validator` crate before use; the
//! composition root builds an [`AppConfig`] once at startup and injects the
//! pieces into the services that need them.

mod settings;

pub use settings::{AppConfig, DatabaseConfig, EncryptionConfig, OAuthProviderConfig};
