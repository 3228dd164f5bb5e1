//! Token refresh manager
//!
//! Per-integration state machine: `active → refreshing → active`, or
//! `refreshing → expired` when the provider rejects the grant. Refreshes for
//! one integration id are serialized through a per-key async mutex; callers
//! that lose the race observe the winner's result instead of issuing their
//! own provider call. Different ids refresh independently.

use crate::crypto::{Cipher, EncryptedBlob};
use crate::domain::{
    AuditAction, AuditLogEntry, AuditOutcome, IntegrationId, IntegrationStatus, OAuthIntegration,
};
use crate::errors::{Result, VaultError};
use crate::oauth::provider::TokenEndpointClient;
use crate::storage::{AuditSink, IntegrationStore};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Manages OAuth2 token pairs for long-lived provider integrations.
pub struct TokenRefreshManager {
    store: Arc<dyn IntegrationStore>,
    audit: Arc<dyn AuditSink>,
    cipher: Arc<dyn Cipher>,
    provider: TokenEndpointClient,
    refresh_skew: chrono::Duration,
    // One mutex per integration id; entries live for the process lifetime,
    // bounded by the number of integrations.
    refresh_locks: DashMap<IntegrationId, Arc<Mutex<()>>>,
}

impl TokenRefreshManager {
    pub fn new(
        store: Arc<dyn IntegrationStore>,
        audit: Arc<dyn AuditSink>,
        cipher: Arc<dyn Cipher>,
        provider: TokenEndpointClient,
        refresh_skew: chrono::Duration,
    ) -> Self {
        Self { store, audit, cipher, provider, refresh_skew, refresh_locks: DashMap::new() }
    }

    /// Return a currently valid access token, refreshing first when the
    /// stored token expires within the skew window.
    ///
    /// An integration in `expired` or `revoked` status is rejected without a
    /// provider call: it stays unusable until re-authorized externally.
    #[instrument(skip(self), fields(integration_id = %id), name = "oauth_get_access_token")]
    pub async fn get_access_token(&self, id: &IntegrationId) -> Result<String> {
        let integration = self.load(id).await?;
        Self::ensure_usable(&integration)?;

        let integration = if self.needs_refresh(&integration) {
            self.refresh_serialized(id, false).await?
        } else {
            integration
        };

        self.decrypt_token(&integration.access_token)
    }

    /// Force a refresh, bypassing the expiry check. Used by [`Self::request`]
    /// after a 401 and available to callers that know their token was
    /// rejected out-of-band.
    #[instrument(skip(self), fields(integration_id = %id), name = "oauth_force_refresh")]
    pub async fn refresh(&self, id: &IntegrationId) -> Result<()> {
        self.refresh_serialized(id, true).await.map(|_| ())
    }

    /// Perform an authenticated call with a valid access token, retrying
    /// exactly once after a forced refresh when the endpoint answers 401. A
    /// second 401 is surfaced as an authorization failure, never retried.
    pub async fn request<F, Fut>(&self, id: &IntegrationId, call: F) -> Result<reqwest::Response>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
    {
        let token = self.get_access_token(id).await?;
        let response = call(token).await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(integration_id = %id, "Request rejected with 401; forcing token refresh");
        self.refresh(id).await?;

        let token = self.get_access_token(id).await?;
        let response = call(token).await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(VaultError::provider_auth(
                "request rejected with 401 after forced token refresh",
            ));
        }

        Ok(response)
    }

    async fn load(&self, id: &IntegrationId) -> Result<OAuthIntegration> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| VaultError::not_found("oauth_integration", id.as_str()))
    }

    fn ensure_usable(integration: &OAuthIntegration) -> Result<()> {
        match integration.status {
            IntegrationStatus::Active => Ok(()),
            IntegrationStatus::Expired => Err(VaultError::provider_auth(
                "integration is expired; re-authorization required",
            )),
            IntegrationStatus::Revoked => Err(VaultError::provider_auth(
                "integration was revoked; re-authorization required",
            )),
        }
    }

    fn needs_refresh(&self, integration: &OAuthIntegration) -> bool {
        chrono::Utc::now() + self.refresh_skew >= integration.expires_at
    }

    /// Serialize refresh per integration id. The winner performs the
    /// provider call; every caller that was blocked on the same lock
    /// re-reads the row and, unless forced, finds a fresh token and returns
    /// without its own provider call.
    async fn refresh_serialized(
        &self,
        id: &IntegrationId,
        force: bool,
    ) -> Result<OAuthIntegration> {
        let lock = self
            .refresh_locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let integration = self.load(id).await?;
        Self::ensure_usable(&integration)?;

        if !force && !self.needs_refresh(&integration) {
            return Ok(integration);
        }

        self.do_refresh(integration).await
    }

    async fn do_refresh(&self, integration: OAuthIntegration) -> Result<OAuthIntegration> {
        let refresh_token = self.decrypt_token(&integration.refresh_token)?;

        match self.provider.refresh(&refresh_token).await {
            Ok(grant) => {
                let access_blob = self.cipher.encrypt(grant.access_token.as_bytes())?;
                let expires_at =
                    chrono::Utc::now() + chrono::Duration::seconds(grant.expires_in as i64);

                // Blob and expiry land in one row update; the record never
                // holds a new token with a stale expiry or vice versa.
                self.store.update_token(&integration.id, &access_blob, expires_at).await?;
                self.audit
                    .append(AuditLogEntry::integration(
                        &integration.id,
                        AuditAction::Refresh,
                        AuditOutcome::Success,
                    ))
                    .await?;

                info!(integration_id = %integration.id, "Access token refreshed");
                self.load(&integration.id).await
            }
            Err(err @ VaultError::ProviderAuth { .. }) => {
                let message = err.to_string();
                self.store
                    .set_status(&integration.id, IntegrationStatus::Expired, Some(&message))
                    .await?;
                self.audit
                    .append(
                        AuditLogEntry::integration(
                            &integration.id,
                            AuditAction::Refresh,
                            AuditOutcome::Failure,
                        )
                        .with_detail(message),
                    )
                    .await?;

                warn!(integration_id = %integration.id, "Refresh token rejected; integration expired");
                Err(err)
            }
            Err(err) => {
                // Transient failure: the stored token pair stays untouched so
                // a later retry with the still-valid-for-now token can
                // succeed.
                self.audit
                    .append(
                        AuditLogEntry::integration(
                            &integration.id,
                            AuditAction::Refresh,
                            AuditOutcome::Failure,
                        )
                        .with_detail(err.to_string()),
                    )
                    .await?;

                Err(err)
            }
        }
    }

    fn decrypt_token(&self, blob: &EncryptedBlob) -> Result<String> {
        let bytes = self.cipher.decrypt(blob)?;
        String::from_utf8(bytes)
            .map_err(|_| VaultError::internal("Decrypted token is not valid UTF-8"))
    }
}

impl std::fmt::Debug for TokenRefreshManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefreshManager")
            .field("refresh_skew", &self.refresh_skew)
            .finish_non_exhaustive()
    }
}
