//! Audit log entries
//!
//! Immutable, append-only records of credential and token activity. Entries
//! are never updated or deleted once written.

use crate::domain::id::{CredentialId, IntegrationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audited operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    View,
    Edit,
    Delete,
    Refresh,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Refresh => "refresh",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "refresh" => Ok(Self::Refresh),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl FromStr for AuditOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            _ => Err(format!("Unknown audit outcome: {}", s)),
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit record. Exactly one of `credential_id` and
/// `integration_id` is expected to be set.
#[derive(Debug, Clone)]
pub struct AuditLogEntry {
    pub credential_id: Option<CredentialId>,
    pub integration_id: Option<IntegrationId>,
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    /// Free-form context; never contains secret material
    pub detail: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AuditLogEntry {
    /// Entry for a credential operation
    pub fn credential(id: &CredentialId, action: AuditAction, outcome: AuditOutcome) -> Self {
        Self {
            credential_id: Some(id.clone()),
            integration_id: None,
            action,
            outcome,
            detail: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Entry for an integration operation
    pub fn integration(id: &IntegrationId, action: AuditAction, outcome: AuditOutcome) -> Self {
        Self {
            credential_id: None,
            integration_id: Some(id.clone()),
            action,
            outcome,
            detail: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Attach free-form context to the entry
    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::View,
            AuditAction::Edit,
            AuditAction::Delete,
            AuditAction::Refresh,
        ] {
            let parsed: AuditAction = action.as_str().parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn test_outcome_roundtrip() {
        for outcome in [AuditOutcome::Success, AuditOutcome::Failure] {
            let parsed: AuditOutcome = outcome.as_str().parse().unwrap();
            assert_eq!(outcome, parsed);
        }
    }

    #[test]
    fn test_credential_entry_sets_one_subject() {
        let id = CredentialId::new();
        let entry = AuditLogEntry::credential(&id, AuditAction::View, AuditOutcome::Success);
        assert_eq!(entry.credential_id, Some(id));
        assert!(entry.integration_id.is_none());
    }

    #[test]
    fn test_with_detail() {
        let id = IntegrationId::new();
        let entry = AuditLogEntry::integration(&id, AuditAction::Refresh, AuditOutcome::Failure)
            .with_detail("provider returned 503");
        assert_eq!(entry.detail.as_deref(), Some("provider returned 503"));
    }
}
