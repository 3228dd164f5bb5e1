//! # Encryption Primitives
//!
//! Authenticated encryption for secrets at rest. One [`Cipher`] abstraction
//! with a single AES-256-GCM implementation, and a [`KeyProvider`] that
//! resolves the process-wide master key once at startup. All higher layers
//! depend on the `Cipher` trait, never on a concrete scheme.

mod cipher;
mod key;

pub use cipher::{AesGcmCipher, Cipher, EncryptedBlob, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
pub use key::{KeyProvider, MasterKey};

/// Mask a secret for log- and UI-safe display: first four characters kept,
/// the remainder replaced with asterisks.
pub fn mask_secret(value: &str) -> String {
    if value.len() < 4 {
        return "****".to_string();
    }
    let visible: String = value.chars().take(4).collect();
    let masked_len = value.chars().count().saturating_sub(4).min(12);
    format!("{}{}", visible, "*".repeat(masked_len.max(4)))
}
