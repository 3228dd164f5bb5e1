//! Master key resolution
//!
//! The encryption key is resolved exactly once, at the composition root,
//! from the configured secret value. There is no fallback to a generated
//! ephemeral key in any non-test code path: a process that cannot resolve a
//! key refuses to serve vault operations, because an ephemeral key would
//! leave every previously stored credential permanently undecryptable after
//! restart.

use crate::config::EncryptionConfig;
use crate::errors::{Result, VaultError};
use base64::Engine;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the master key in bytes (AES-256)
pub const KEY_SIZE: usize = 32;

/// Minimum accepted passphrase length when the configured secret is not raw
/// key material
const MIN_PASSPHRASE_LEN: usize = 16;

/// Fixed application-level salt for passphrase stretching. Changing this
/// value invalidates every key derived from a passphrase.
const PASSPHRASE_SALT: &[u8] = b"keywarden/master-key/v1";

/// Process-wide 256-bit master key. Held in memory for the process lifetime
/// and zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Fixed key for tests only; never reachable from production code.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self([0x42u8; KEY_SIZE])
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MasterKey").field(&"[REDACTED]").finish()
    }
}

/// Resolves the process-wide encryption key from configuration.
pub struct KeyProvider;

impl KeyProvider {
    /// Resolve the master key, failing fast when no usable secret is
    /// configured.
    ///
    /// A base64 value decoding to exactly 32 bytes is used as raw key
    /// material. Anything else is treated as a passphrase and stretched with
    /// Argon2id under a fixed application salt.
    pub fn resolve(config: &EncryptionConfig) -> Result<MasterKey> {
        let secret = config.secret.trim();
        if secret.is_empty() {
            return Err(VaultError::key_not_configured(
                "KEYWARDEN_ENCRYPTION_KEY is empty. \
                 Generate a key with: openssl rand -base64 32",
            ));
        }

        if let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(secret) {
            if raw.len() == KEY_SIZE {
                let mut key = [0u8; KEY_SIZE];
                key.copy_from_slice(&raw);
                debug!("Master key loaded from raw key material");
                return Ok(MasterKey(key));
            }
        }

        Self::derive_from_passphrase(secret)
    }

    fn derive_from_passphrase(passphrase: &str) -> Result<MasterKey> {
        if passphrase.len() < MIN_PASSPHRASE_LEN {
            return Err(VaultError::key_not_configured(format!(
                "Configured secret is neither a base64 32-byte key nor a passphrase of at \
                 least {} characters",
                MIN_PASSPHRASE_LEN
            )));
        }

        let mut key = [0u8; KEY_SIZE];
        argon2::Argon2::default()
            .hash_password_into(passphrase.as_bytes(), PASSPHRASE_SALT, &mut key)
            .map_err(|err| {
                VaultError::key_not_configured(format!(
                    "Failed to derive master key from passphrase: {}",
                    err
                ))
            })?;

        debug!("Master key derived from passphrase");
        Ok(MasterKey(key))
    }
}
