//! Repository layer for vault persistence
//!
//! Each repository exposes a narrow trait the services depend on, plus the
//! SQLx-backed implementation wired in at the composition root.

mod audit_log;
mod credential;
mod integration;

pub use audit_log::{AuditSink, SqlxAuditLog};
pub use credential::{CredentialStore, SqlxCredentialStore};
pub use integration::{IntegrationStore, SqlxIntegrationStore};
