//! Credential record entity
//!
//! One record per (tenant, platform type). Sensitive sub-fields exist only
//! as [`EncryptedBlob`]s once the record leaves the upsert path; plain
//! sub-fields are stored as supplied.

use crate::crypto::EncryptedBlob;
use crate::domain::id::{CredentialId, TenantId};
use crate::domain::platform::PlatformType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Result of the most recent connection test against the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No connection test has been run yet
    Untested,
    /// The last connection test succeeded
    Ok,
    /// The last connection test failed
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untested => "untested",
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "untested" => Ok(Self::Untested),
            "ok" => Ok(Self::Ok),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown connection status: {}", s)),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored credential set for one (tenant, platform) pair.
///
/// Invariant: `sensitive_fields` and `plain_fields` are disjoint; a value
/// classified sensitive never appears in `plain_fields`.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub tenant_id: TenantId,
    pub platform: PlatformType,
    pub plain_fields: BTreeMap<String, String>,
    pub sensitive_fields: BTreeMap<String, EncryptedBlob>,
    pub is_active: bool,
    pub connection_status: ConnectionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
