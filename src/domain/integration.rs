//! OAuth integration entity
//!
//! One record per (tenant, provider). The access token blob and its expiry
//! timestamp describe the same token at all times: both are written by a
//! single atomic row update, never independently.

use crate::crypto::EncryptedBlob;
use crate::domain::id::{IntegrationId, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an OAuth integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    /// Tokens are usable; refreshes are expected to succeed
    Active,
    /// The refresh token was rejected by the provider; a fresh end-user
    /// authorization is required before any further token use
    Expired,
    /// The end user revoked access
    Revoked,
}

impl IntegrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for IntegrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            _ => Err(format!("Unknown integration status: {}", s)),
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored OAuth2 token pair for one long-lived provider integration.
#[derive(Debug, Clone)]
pub struct OAuthIntegration {
    pub id: IntegrationId,
    pub tenant_id: TenantId,
    /// Provider identifier (e.g. "google_business_profile")
    pub provider: String,
    pub access_token: EncryptedBlob,
    pub refresh_token: EncryptedBlob,
    /// Absolute expiry of the token in `access_token`
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub status: IntegrationStatus,
    pub last_error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
