//! Credential record repository
//!
//! Persistence for per-(tenant, platform) credential records. Writes go
//! through a single conditional row statement so concurrent upserts for the
//! same record resolve to last-writer-wins at row granularity, never a torn
//! mix of fields.

use crate::crypto::EncryptedBlob;
use crate::domain::{ConnectionStatus, CredentialId, CredentialRecord, PlatformType, TenantId};
use crate::errors::{Result, VaultError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use std::collections::BTreeMap;
use tracing::instrument;

/// Narrow storage interface consumed by the credential vault
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the record for a (tenant, platform) pair
    async fn get(
        &self,
        tenant_id: &TenantId,
        platform: PlatformType,
    ) -> Result<Option<CredentialRecord>>;

    /// Fetch a record by its identifier
    async fn get_by_id(&self, id: &CredentialId) -> Result<Option<CredentialRecord>>;

    /// Write the record with a single conditional row statement
    async fn put(&self, record: &CredentialRecord) -> Result<()>;

    /// Flip the activity flag; returns false when no such row exists
    async fn set_active(&self, id: &CredentialId, active: bool) -> Result<bool>;

    /// Record the outcome of the most recent connection test
    async fn set_connection_status(
        &self,
        id: &CredentialId,
        status: ConnectionStatus,
    ) -> Result<bool>;
}

/// Database row structure for credential records
#[derive(Debug, FromRow)]
struct CredentialRow {
    id: String,
    tenant_id: String,
    platform_type: String,
    plain_fields: String,
    sensitive_fields: String,
    is_active: bool,
    connection_status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl CredentialRow {
    fn into_record(self) -> Result<CredentialRecord> {
        let platform = self.platform_type.parse::<PlatformType>().map_err(|_| {
            VaultError::internal(format!("Unknown platform type in row: {}", self.platform_type))
        })?;
        let connection_status =
            self.connection_status.parse::<ConnectionStatus>().map_err(|_| {
                VaultError::internal(format!(
                    "Unknown connection status in row: {}",
                    self.connection_status
                ))
            })?;

        let plain_fields: BTreeMap<String, String> =
            serde_json::from_str(&self.plain_fields).map_err(|e| VaultError::Serialization {
                source: e,
                context: "Failed to parse plain fields".to_string(),
            })?;
        let sensitive_fields: BTreeMap<String, EncryptedBlob> =
            serde_json::from_str(&self.sensitive_fields).map_err(|e| {
                VaultError::Serialization {
                    source: e,
                    context: "Failed to parse sensitive fields".to_string(),
                }
            })?;

        Ok(CredentialRecord {
            id: CredentialId::from_string(self.id),
            tenant_id: TenantId::from_string(self.tenant_id),
            platform,
            plain_fields,
            sensitive_fields,
            is_active: self.is_active,
            connection_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, platform_type, plain_fields, sensitive_fields, \
                              is_active, connection_status, created_at, updated_at";

/// SQLx-backed credential store
#[derive(Debug, Clone)]
pub struct SqlxCredentialStore {
    pool: DbPool,
}

impl SqlxCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for SqlxCredentialStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, platform = %platform), name = "db_get_credential")]
    async fn get(
        &self,
        tenant_id: &TenantId,
        platform: PlatformType,
    ) -> Result<Option<CredentialRecord>> {
        let query = format!(
            "SELECT {} FROM credential_records WHERE tenant_id = $1 AND platform_type = $2",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, CredentialRow>(&query)
            .bind(tenant_id)
            .bind(platform.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VaultError::Database {
                source: e,
                context: format!(
                    "Failed to get credential record for tenant '{}' platform '{}'",
                    tenant_id, platform
                ),
            })?;

        row.map(CredentialRow::into_record).transpose()
    }

    #[instrument(skip(self), fields(credential_id = %id), name = "db_get_credential_by_id")]
    async fn get_by_id(&self, id: &CredentialId) -> Result<Option<CredentialRecord>> {
        let query = format!("SELECT {} FROM credential_records WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, CredentialRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VaultError::Database {
                source: e,
                context: format!("Failed to get credential record '{}'", id),
            })?;

        row.map(CredentialRow::into_record).transpose()
    }

    #[instrument(skip(self, record), fields(credential_id = %record.id, platform = %record.platform), name = "db_put_credential")]
    async fn put(&self, record: &CredentialRecord) -> Result<()> {
        let plain_json = serde_json::to_string(&record.plain_fields)?;
        let sensitive_json = serde_json::to_string(&record.sensitive_fields)?;

        sqlx::query(
            "INSERT INTO credential_records \
             (id, tenant_id, platform_type, plain_fields, sensitive_fields, is_active, \
              connection_status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (tenant_id, platform_type) DO UPDATE SET \
                 plain_fields = excluded.plain_fields, \
                 sensitive_fields = excluded.sensitive_fields, \
                 is_active = excluded.is_active, \
                 connection_status = excluded.connection_status, \
                 updated_at = excluded.updated_at",
        )
        .bind(&record.id)
        .bind(&record.tenant_id)
        .bind(record.platform.as_str())
        .bind(&plain_json)
        .bind(&sensitive_json)
        .bind(record.is_active)
        .bind(record.connection_status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, credential_id = %record.id, "Failed to write credential record");
            VaultError::Database {
                source: e,
                context: format!("Failed to write credential record '{}'", record.id),
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(credential_id = %id, active), name = "db_set_credential_active")]
    async fn set_active(&self, id: &CredentialId, active: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE credential_records SET is_active = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(active)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to update activity flag for credential '{}'", id),
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(credential_id = %id, status = %status), name = "db_set_connection_status")]
    async fn set_connection_status(
        &self,
        id: &CredentialId,
        status: ConnectionStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE credential_records SET connection_status = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(status.as_str())
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to update connection status for credential '{}'", id),
        })?;

        Ok(result.rows_affected() > 0)
    }
}
