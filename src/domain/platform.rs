//! Platform types and field classification
//!
//! Each platform a tenant can connect carries a fixed set of plain and
//! sensitive sub-fields. The classification is the single source of truth
//! for which values must be encrypted before persistence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of third-party system a credential set targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    /// Content management system admin access (e.g. WordPress)
    Cms,
    /// FTP/FTPS/SFTP file transfer access
    FtpFamily,
    /// Hosted deployment target (e.g. Vercel project)
    DeployTarget,
    /// Version control hosting (e.g. GitHub repository)
    Vcs,
    /// Direct shell access
    Ssh,
    /// E-commerce storefront API (e.g. Shopify)
    Storefront,
}

/// Field classification for one platform type
#[derive(Debug, Clone, Copy)]
pub struct PlatformSchema {
    /// Fields stored as-is
    pub plain: &'static [&'static str],
    /// Fields that must never be persisted or logged in plaintext
    pub sensitive: &'static [&'static str],
}

impl PlatformType {
    /// All known platform types
    pub const ALL: [PlatformType; 6] = [
        Self::Cms,
        Self::FtpFamily,
        Self::DeployTarget,
        Self::Vcs,
        Self::Ssh,
        Self::Storefront,
    ];

    /// Get the database representation of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cms => "cms",
            Self::FtpFamily => "ftp_family",
            Self::DeployTarget => "deploy_target",
            Self::Vcs => "vcs",
            Self::Ssh => "ssh",
            Self::Storefront => "storefront",
        }
    }

    /// Field classification for this platform
    pub fn schema(&self) -> PlatformSchema {
        match self {
            Self::Cms => PlatformSchema {
                plain: &["admin_url", "username", "cms_version"],
                sensitive: &["password", "app_password"],
            },
            Self::FtpFamily => PlatformSchema {
                plain: &["host", "port", "protocol", "username", "root_path"],
                sensitive: &["password"],
            },
            Self::DeployTarget => PlatformSchema {
                plain: &["project_id", "target_url"],
                sensitive: &["deploy_token"],
            },
            Self::Vcs => PlatformSchema {
                plain: &["repository", "branch", "auto_pr"],
                sensitive: &["access_token"],
            },
            Self::Ssh => PlatformSchema {
                plain: &["host", "port", "username"],
                sensitive: &["private_key", "passphrase"],
            },
            Self::Storefront => PlatformSchema {
                plain: &["store_url", "api_version"],
                sensitive: &["access_token"],
            },
        }
    }

    /// Check whether a field must be encrypted before persistence
    pub fn is_sensitive(&self, field: &str) -> bool {
        self.schema().sensitive.contains(&field)
    }

    /// Check whether a field belongs to this platform at all
    pub fn is_known_field(&self, field: &str) -> bool {
        let schema = self.schema();
        schema.plain.contains(&field) || schema.sensitive.contains(&field)
    }
}

impl FromStr for PlatformType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cms" => Ok(Self::Cms),
            "ftp_family" => Ok(Self::FtpFamily),
            "deploy_target" => Ok(Self::DeployTarget),
            "vcs" => Ok(Self::Vcs),
            "ssh" => Ok(Self::Ssh),
            "storefront" => Ok(Self::Storefront),
            _ => Err(format!("Unknown platform type: {}", s)),
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
