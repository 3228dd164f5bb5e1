//! # Storage and Persistence
//!
//! Database connectivity and persistence for credential records, OAuth
//! integrations, and the audit log. Services depend on the repository
//! traits; the SQLx implementations here are wired in at the composition
//! root.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use crate::config::DatabaseConfig;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool};
pub use repositories::{
    AuditSink, CredentialStore, IntegrationStore, SqlxAuditLog, SqlxCredentialStore,
    SqlxIntegrationStore,
};

use crate::errors::{Result, VaultError};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| VaultError::Database {
        source: e,
        context: "Database connectivity check failed".to_string(),
    })?;

    Ok(())
}
