//! Integration tests for the credential vault against SQLite storage.

mod common;

use common::{other_cipher, test_cipher, TestDatabase};
use keywarden::crypto::Cipher;
use keywarden::domain::{
    AuditAction, AuditOutcome, ConnectionStatus, CredentialId, PlatformType, TenantId,
};
use keywarden::storage::{AuditSink, SqlxAuditLog, SqlxCredentialStore};
use keywarden::vault::CredentialVault;
use keywarden::VaultError;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Harness {
    _db: TestDatabase,
    vault: CredentialVault,
    audit: Arc<SqlxAuditLog>,
    pool: keywarden::storage::DbPool,
}

async fn harness() -> Harness {
    let db = TestDatabase::new().await;
    let pool = db.pool().clone();
    let audit = Arc::new(SqlxAuditLog::new(pool.clone()));
    let vault = CredentialVault::new(
        Arc::new(SqlxCredentialStore::new(pool.clone())),
        audit.clone(),
        Arc::new(test_cipher()),
    );
    Harness { _db: db, vault, audit, pool }
}

fn ftp_fields() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("host".to_string(), "ftp.example.com".to_string()),
        ("port".to_string(), "21".to_string()),
        ("protocol".to_string(), "ftps".to_string()),
        ("username".to_string(), "deploy".to_string()),
        ("password".to_string(), "hunter2-but-longer".to_string()),
    ])
}

#[tokio::test]
async fn upsert_then_masked_fetch_round_trip() {
    let h = harness().await;
    let tenant = TenantId::new();

    let id = h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    let masked = h.vault.fetch(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    assert_eq!(masked.id, id);
    assert_eq!(masked.fields.get("host").map(String::as_str), Some("ftp.example.com"));
    assert_eq!(masked.presence.get("has_password"), Some(&true));
    assert!(masked.is_active);
    assert_eq!(masked.connection_status, ConnectionStatus::Untested);

    // No plaintext secret anywhere in the serialized response.
    let json = serde_json::to_string(&masked).unwrap();
    assert!(!json.contains("hunter2"));
}

#[tokio::test]
async fn masked_fetch_never_contains_secret_even_in_raw_row() {
    let h = harness().await;
    let tenant = TenantId::new();
    h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    // The persisted row itself must not contain the plaintext either.
    let (plain, sensitive): (String, String) = sqlx::query_as(
        "SELECT plain_fields, sensitive_fields FROM credential_records WHERE tenant_id = $1",
    )
    .bind(tenant.as_str())
    .fetch_one(&h.pool)
    .await
    .unwrap();

    assert!(!plain.contains("hunter2"));
    assert!(!sensitive.contains("hunter2"));
}

#[tokio::test]
async fn reveal_returns_exactly_the_submitted_secrets() {
    let h = harness().await;
    let tenant = TenantId::new();
    h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    let revealed =
        h.vault.fetch_revealed(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    assert_eq!(
        revealed.secrets.get("password"),
        Some(&Some("hunter2-but-longer".to_string()))
    );
    assert!(revealed.warnings.is_empty());
}

#[tokio::test]
async fn reveal_writes_view_audit_entry_to_database() {
    let h = harness().await;
    let tenant = TenantId::new();
    let id = h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    h.vault.fetch_revealed(&tenant, PlatformType::FtpFamily).await.unwrap();
    h.vault.fetch_revealed(&tenant, PlatformType::FtpFamily).await.unwrap();

    let entries = h.audit.for_credential(&id).await.unwrap();
    let views: Vec<_> = entries.iter().filter(|e| e.action == AuditAction::View).collect();
    assert_eq!(views.len(), 2, "one view entry per reveal");
    assert!(views.iter().all(|e| e.outcome == AuditOutcome::Success));
}

#[tokio::test]
async fn partial_update_keeps_unsupplied_fields() {
    let h = harness().await;
    let tenant = TenantId::new();
    let id1 = h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    let update = BTreeMap::from([("host".to_string(), "sftp.example.com".to_string())]);
    let id2 = h.vault.upsert(&tenant, PlatformType::FtpFamily, update).await.unwrap();
    assert_eq!(id1, id2);

    let revealed =
        h.vault.fetch_revealed(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    assert_eq!(revealed.fields.get("host").map(String::as_str), Some("sftp.example.com"));
    assert_eq!(revealed.fields.get("username").map(String::as_str), Some("deploy"));
    assert_eq!(
        revealed.secrets.get("password"),
        Some(&Some("hunter2-but-longer".to_string()))
    );

    let entries = h.audit.for_credential(&id1).await.unwrap();
    let actions: Vec<AuditAction> = entries
        .iter()
        .filter(|e| e.action != AuditAction::View)
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec![AuditAction::Create, AuditAction::Edit]);
}

#[tokio::test]
async fn records_for_different_platforms_are_independent() {
    let h = harness().await;
    let tenant = TenantId::new();

    h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();
    h.vault
        .upsert(
            &tenant,
            PlatformType::Vcs,
            BTreeMap::from([
                ("repository".to_string(), "acme/site".to_string()),
                ("access_token".to_string(), "ghp_token_value".to_string()),
            ]),
        )
        .await
        .unwrap();

    let ftp = h.vault.fetch(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    let vcs = h.vault.fetch(&tenant, PlatformType::Vcs).await.unwrap().unwrap();
    assert_ne!(ftp.id, vcs.id);
    assert_eq!(vcs.presence.get("has_access_token"), Some(&true));
}

#[tokio::test]
async fn blob_from_another_key_degrades_to_null_on_reveal() {
    let h = harness().await;
    let tenant = TenantId::new();
    h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    // Simulate a historical key rotation: replace the stored blob with one
    // sealed under a different master key.
    let foreign_blob = other_cipher().encrypt(b"old-password").unwrap();
    let sensitive_json =
        serde_json::to_string(&BTreeMap::from([("password".to_string(), foreign_blob)])).unwrap();
    sqlx::query("UPDATE credential_records SET sensitive_fields = $1 WHERE tenant_id = $2")
        .bind(&sensitive_json)
        .bind(tenant.as_str())
        .execute(&h.pool)
        .await
        .unwrap();

    let revealed =
        h.vault.fetch_revealed(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    assert_eq!(revealed.secrets.get("password"), Some(&None));
    assert_eq!(revealed.warnings.len(), 1);
    assert!(revealed.warnings[0].contains("password"));
}

#[tokio::test]
async fn deactivate_preserves_row_and_audit_trail() {
    let h = harness().await;
    let tenant = TenantId::new();
    let id = h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    h.vault.deactivate(&id).await.unwrap();

    let masked = h.vault.fetch(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    assert!(!masked.is_active, "record stays readable, flagged inactive");

    let entries = h.audit.for_credential(&id).await.unwrap();
    assert!(entries.iter().any(|e| e.action == AuditAction::Delete));

    // Audit entries survive in the database independently of the record.
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM credential_audit_log WHERE credential_id = $1")
            .bind(id.as_str())
            .fetch_one(&h.pool)
            .await
            .unwrap();
    assert_eq!(count.0, entries.len() as i64);
}

#[tokio::test]
async fn deactivate_unknown_credential_is_not_found() {
    let h = harness().await;
    let result = h.vault.deactivate(&CredentialId::new()).await;
    assert!(matches!(result, Err(VaultError::NotFound { .. })));
}

#[tokio::test]
async fn mark_connection_status_persists() {
    let h = harness().await;
    let tenant = TenantId::new();
    let id = h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    h.vault.mark_connection_status(&id, ConnectionStatus::Failed).await.unwrap();

    let masked = h.vault.fetch(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    assert_eq!(masked.connection_status, ConnectionStatus::Failed);
}

#[tokio::test]
async fn concurrent_upserts_do_not_tear_the_row() {
    let h = harness().await;
    let tenant = TenantId::new();
    h.vault.upsert(&tenant, PlatformType::FtpFamily, ftp_fields()).await.unwrap();

    let vault = Arc::new(h.vault.clone());
    let mut handles = Vec::new();
    for i in 0..8 {
        let vault = vault.clone();
        let tenant = tenant.clone();
        handles.push(tokio::spawn(async move {
            let fields = BTreeMap::from([
                ("host".to_string(), format!("host-{}.example.com", i)),
                ("password".to_string(), format!("password-{}", i)),
            ]);
            vault.upsert(&tenant, PlatformType::FtpFamily, fields).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Whichever writer won, host and password come from the same writer.
    let revealed =
        h.vault.fetch_revealed(&tenant, PlatformType::FtpFamily).await.unwrap().unwrap();
    let host = revealed.fields.get("host").unwrap();
    let password = revealed.secrets.get("password").unwrap().clone().unwrap();
    let host_n = host.trim_start_matches("host-").trim_end_matches(".example.com");
    assert_eq!(password, format!("password-{}", host_n));
}
