//! OAuth integration repository
//!
//! Persistence for OAuth token pairs. `update_token` writes the access-token
//! blob and its expiry in one row update: the two can never diverge, and a
//! successful token write also reinstates active status and clears the last
//! error, mirroring a completed refresh.

use crate::crypto::EncryptedBlob;
use crate::domain::{IntegrationId, IntegrationStatus, OAuthIntegration, TenantId};
use crate::errors::{Result, VaultError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

/// Narrow storage interface consumed by the token refresh manager
#[async_trait]
pub trait IntegrationStore: Send + Sync {
    /// Fetch an integration by id
    async fn get(&self, id: &IntegrationId) -> Result<Option<OAuthIntegration>>;

    /// Create an integration row (called by the external authorization flow)
    async fn insert(&self, integration: &OAuthIntegration) -> Result<()>;

    /// Atomically replace the access-token blob and expiry together; also
    /// sets status to active and clears the last error in the same statement
    async fn update_token(
        &self,
        id: &IntegrationId,
        access_token: &EncryptedBlob,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;

    /// Update lifecycle status and last error
    async fn set_status(
        &self,
        id: &IntegrationId,
        status: IntegrationStatus,
        last_error: Option<&str>,
    ) -> Result<()>;
}

/// Database row structure for OAuth integrations
#[derive(Debug, FromRow)]
struct IntegrationRow {
    id: String,
    tenant_id: String,
    provider: String,
    access_token: String,
    refresh_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    status: String,
    last_error: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl IntegrationRow {
    fn into_integration(self) -> Result<OAuthIntegration> {
        let status = self.status.parse::<IntegrationStatus>().map_err(|_| {
            VaultError::internal(format!("Unknown integration status in row: {}", self.status))
        })?;

        Ok(OAuthIntegration {
            id: IntegrationId::from_string(self.id),
            tenant_id: TenantId::from_string(self.tenant_id),
            provider: self.provider,
            access_token: EncryptedBlob::decode(&self.access_token)?,
            refresh_token: EncryptedBlob::decode(&self.refresh_token)?,
            expires_at: self.expires_at,
            status,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SQLx-backed integration store
#[derive(Debug, Clone)]
pub struct SqlxIntegrationStore {
    pool: DbPool,
}

impl SqlxIntegrationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationStore for SqlxIntegrationStore {
    #[instrument(skip(self), fields(integration_id = %id), name = "db_get_integration")]
    async fn get(&self, id: &IntegrationId) -> Result<Option<OAuthIntegration>> {
        let row = sqlx::query_as::<_, IntegrationRow>(
            "SELECT id, tenant_id, provider, access_token, refresh_token, expires_at, status, \
             last_error, created_at, updated_at \
             FROM oauth_integrations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to get integration '{}'", id),
        })?;

        row.map(IntegrationRow::into_integration).transpose()
    }

    #[instrument(skip(self, integration), fields(integration_id = %integration.id, provider = %integration.provider), name = "db_insert_integration")]
    async fn insert(&self, integration: &OAuthIntegration) -> Result<()> {
        sqlx::query(
            "INSERT INTO oauth_integrations \
             (id, tenant_id, provider, access_token, refresh_token, expires_at, status, \
              last_error, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&integration.id)
        .bind(&integration.tenant_id)
        .bind(&integration.provider)
        .bind(integration.access_token.encode())
        .bind(integration.refresh_token.encode())
        .bind(integration.expires_at)
        .bind(integration.status.as_str())
        .bind(&integration.last_error)
        .bind(integration.created_at)
        .bind(integration.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, integration_id = %integration.id, "Failed to insert integration");
            VaultError::Database {
                source: e,
                context: format!("Failed to insert integration '{}'", integration.id),
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self, access_token), fields(integration_id = %id), name = "db_update_integration_token")]
    async fn update_token(
        &self,
        id: &IntegrationId,
        access_token: &EncryptedBlob,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE oauth_integrations SET \
                 access_token = $1, \
                 expires_at = $2, \
                 status = 'active', \
                 last_error = NULL, \
                 updated_at = $3 \
             WHERE id = $4",
        )
        .bind(access_token.encode())
        .bind(expires_at)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to update token for integration '{}'", id),
        })?;

        if result.rows_affected() == 0 {
            return Err(VaultError::not_found("oauth_integration", id.as_str()));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(integration_id = %id, status = %status), name = "db_set_integration_status")]
    async fn set_status(
        &self,
        id: &IntegrationId,
        status: IntegrationStatus,
        last_error: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE oauth_integrations SET status = $1, last_error = $2, updated_at = $3 \
             WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(last_error)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to update status for integration '{}'", id),
        })?;

        if result.rows_affected() == 0 {
            return Err(VaultError::not_found("oauth_integration", id.as_str()));
        }

        Ok(())
    }
}
