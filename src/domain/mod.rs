//! # Domain Types
//!
//! Core entities for the credential vault and OAuth token lifecycle:
//! type-safe identifiers, platform field classification, credential records,
//! integrations, and audit entries.

pub mod audit;
pub mod credential;
pub mod id;
pub mod integration;
pub mod platform;

pub use audit::{AuditAction, AuditLogEntry, AuditOutcome};
pub use credential::{ConnectionStatus, CredentialRecord};
pub use id::{CredentialId, IntegrationId, TenantId};
pub use integration::{IntegrationStatus, OAuthIntegration};
pub use platform::{PlatformSchema, PlatformType};
