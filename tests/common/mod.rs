//! Shared helpers for integration tests.

#![allow(dead_code)]

use base64::Engine;
use keywarden::config::EncryptionConfig;
use keywarden::crypto::{AesGcmCipher, KeyProvider};
use keywarden::storage::{self, DbPool};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

/// A file-backed SQLite test database with migrations applied. The backing
/// directory is removed when this struct is dropped.
pub struct TestDatabase {
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("create test database directory");
        let path = dir.path().join("keywarden_test.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("create test database pool");

        storage::run_migrations(&pool).await.expect("run migrations for test database");

        Self { pool, _dir: dir }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Cipher resolved through the production key path from a fixed test key.
pub fn test_cipher() -> AesGcmCipher {
    cipher_with_key([0x42u8; 32])
}

/// Cipher for a different key, for cross-key decryption failures.
pub fn other_cipher() -> AesGcmCipher {
    cipher_with_key([0x24u8; 32])
}

fn cipher_with_key(raw: [u8; 32]) -> AesGcmCipher {
    let secret = base64::engine::general_purpose::STANDARD.encode(raw);
    let key = KeyProvider::resolve(&EncryptionConfig { secret }).expect("resolve test key");
    AesGcmCipher::new(key)
}
