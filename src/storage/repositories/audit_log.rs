//! Audit log repository
//!
//! Append-only persistence for credential and token activity. The table has
//! no update or delete path.

use crate::domain::{AuditAction, AuditLogEntry, AuditOutcome, CredentialId, IntegrationId};
use crate::errors::{Result, VaultError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

/// Append-only audit sink consumed by the vault and the refresh manager
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: AuditLogEntry) -> Result<()>;

    /// All entries for a credential, oldest first
    async fn for_credential(&self, id: &CredentialId) -> Result<Vec<AuditLogEntry>>;

    /// All entries for an integration, oldest first
    async fn for_integration(&self, id: &IntegrationId) -> Result<Vec<AuditLogEntry>>;
}

/// Database row structure for audit entries
#[derive(Debug, FromRow)]
struct AuditRow {
    credential_id: Option<String>,
    integration_id: Option<String>,
    action: String,
    outcome: String,
    detail: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditLogEntry> {
        let action = self.action.parse::<AuditAction>().map_err(|_| {
            VaultError::internal(format!("Unknown audit action in row: {}", self.action))
        })?;
        let outcome = self.outcome.parse::<AuditOutcome>().map_err(|_| {
            VaultError::internal(format!("Unknown audit outcome in row: {}", self.outcome))
        })?;

        Ok(AuditLogEntry {
            credential_id: self.credential_id.map(CredentialId::from_string),
            integration_id: self.integration_id.map(IntegrationId::from_string),
            action,
            outcome,
            detail: self.detail,
            created_at: self.created_at,
        })
    }
}

/// SQLx-backed append-only audit log
#[derive(Debug, Clone)]
pub struct SqlxAuditLog {
    pool: DbPool,
}

impl SqlxAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for SqlxAuditLog {
    #[instrument(skip(self, entry), fields(action = %entry.action, outcome = %entry.outcome), name = "db_append_audit")]
    async fn append(&self, entry: AuditLogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO credential_audit_log \
             (credential_id, integration_id, action, outcome, detail, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&entry.credential_id)
        .bind(&entry.integration_id)
        .bind(entry.action.as_str())
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: "Failed to append audit log entry".to_string(),
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(credential_id = %id), name = "db_audit_for_credential")]
    async fn for_credential(&self, id: &CredentialId) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT credential_id, integration_id, action, outcome, detail, created_at \
             FROM credential_audit_log WHERE credential_id = $1 ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to list audit entries for credential '{}'", id),
        })?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }

    #[instrument(skip(self), fields(integration_id = %id), name = "db_audit_for_integration")]
    async fn for_integration(&self, id: &IntegrationId) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT credential_id, integration_id, action, outcome, detail, created_at \
             FROM credential_audit_log WHERE integration_id = $1 ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to list audit entries for integration '{}'", id),
        })?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }
}
