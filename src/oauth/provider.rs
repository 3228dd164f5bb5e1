//! OAuth2 token endpoint client
//!
//! Speaks the provider's refresh-token grant: a single form-encoded POST
//! returning `{access_token, expires_in}` on success or
//! `{error, error_description}` on failure.

use crate::config::OAuthProviderConfig;
use crate::errors::{Result, VaultError};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Successful refresh grant
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime of the new access token in seconds
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct RefreshSuccess {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct RefreshFailure {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// HTTP client for the provider's token endpoint
#[derive(Debug, Clone)]
pub struct TokenEndpointClient {
    http: reqwest::Client,
    config: OAuthProviderConfig,
}

impl TokenEndpointClient {
    pub fn new(config: OAuthProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.http_timeout()).build().map_err(
            |e| VaultError::config_with_source("Failed to build HTTP client", Box::new(e)),
        )?;

        Ok(Self { http, config })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Transport failures, timeouts, and 5xx responses are
    /// [`VaultError::ProviderTransient`]: the caller's stored state must not
    /// change. Only an explicit `invalid_grant` from the provider proves the
    /// refresh token unusable and maps to [`VaultError::ProviderAuth`].
    #[instrument(skip(self, refresh_token), name = "oauth_token_refresh")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.http.post(&self.config.token_url).form(&params).send().await?;
        let status = response.status();

        if status.is_success() {
            let grant: RefreshSuccess = response.json().await.map_err(|e| {
                VaultError::provider_transient(format!("Malformed token response: {}", e))
            })?;
            debug!(expires_in = grant.expires_in, "Provider issued new access token");
            return Ok(TokenGrant {
                access_token: grant.access_token,
                expires_in: grant.expires_in,
            });
        }

        if status.is_server_error() {
            warn!(status = status.as_u16(), "Provider token endpoint returned server error");
            return Err(VaultError::provider_transient(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let failure = response.json::<RefreshFailure>().await.unwrap_or(RefreshFailure {
            error: format!("http_{}", status.as_u16()),
            error_description: None,
        });

        let message = failure.error_description.unwrap_or_else(|| failure.error.clone());

        if failure.error == "invalid_grant" {
            warn!(status = status.as_u16(), "Provider rejected refresh token");
            return Err(VaultError::provider_auth(message));
        }

        // Other 4xx payloads (invalid_request, rate limiting, ...) do not
        // prove the refresh token dead; leave stored state for a later retry.
        Err(VaultError::provider_transient(format!(
            "Token endpoint rejected refresh ({}): {}",
            failure.error, message
        )))
    }
}
