//! Authenticated encryption of secret values using AES-256-GCM
//!
//! Every encryption call draws a fresh random salt and nonce from the system
//! CSPRNG. The salt drives HKDF-SHA256 subkey derivation from the master key,
//! so no two blobs are sealed under the same (key, nonce) pair even across
//! process restarts.

use crate::crypto::key::MasterKey;
use crate::errors::{Result, VaultError};
use base64::Engine;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, error};

/// Size of the per-blob key-derivation salt in bytes
pub const SALT_SIZE: usize = 32;

/// Size of the AES-256-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// HKDF info label binding derived subkeys to this use
const BLOB_KEY_INFO: &[u8] = b"keywarden/blob-key/v1";

/// Opaque persisted representation of one encrypted secret value.
///
/// All four components are required to decrypt. The wire format is four
/// base64 segments joined by `:` (`salt:nonce:tag:ciphertext`); a value that
/// does not parse into exactly these components is malformed and rejected
/// before any decryption is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encode as the `salt:nonce:tag:ciphertext` wire format.
    pub fn encode(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD;
        format!(
            "{}:{}:{}:{}",
            b64.encode(&self.salt),
            b64.encode(&self.nonce),
            b64.encode(&self.tag),
            b64.encode(&self.ciphertext)
        )
    }

    /// Decode from the wire format, rejecting malformed input.
    pub fn decode(encoded: &str) -> Result<Self> {
        let parts: Vec<&str> = encoded.split(':').collect();
        if parts.len() != 4 {
            return Err(VaultError::validation(format!(
                "Malformed encrypted blob: expected 4 components, got {}",
                parts.len()
            )));
        }

        let b64 = base64::engine::general_purpose::STANDARD;
        let decode_part = |part: &str| {
            b64.decode(part).map_err(|_| {
                VaultError::validation("Malformed encrypted blob: invalid base64 component")
            })
        };

        let blob = Self {
            salt: decode_part(parts[0])?,
            nonce: decode_part(parts[1])?,
            tag: decode_part(parts[2])?,
            ciphertext: decode_part(parts[3])?,
        };
        blob.validate()?;
        Ok(blob)
    }

    /// Check component lengths. Runs before decryption so a structurally
    /// broken blob never reaches the AEAD layer.
    pub fn validate(&self) -> Result<()> {
        if self.salt.len() != SALT_SIZE {
            return Err(VaultError::validation(format!(
                "Malformed encrypted blob: salt must be {} bytes, got {}",
                SALT_SIZE,
                self.salt.len()
            )));
        }
        if self.nonce.len() != NONCE_SIZE {
            return Err(VaultError::validation(format!(
                "Malformed encrypted blob: nonce must be {} bytes, got {}",
                NONCE_SIZE,
                self.nonce.len()
            )));
        }
        if self.tag.len() != TAG_SIZE {
            return Err(VaultError::validation(format!(
                "Malformed encrypted blob: tag must be {} bytes, got {}",
                TAG_SIZE,
                self.tag.len()
            )));
        }
        Ok(())
    }
}

impl Serialize for EncryptedBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for EncryptedBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        EncryptedBlob::decode(&encoded).map_err(|e| D::Error::custom(e.to_string()))
    }
}

/// Authenticated symmetric encryption of opaque byte strings.
///
/// Implementations must be probabilistic: encrypting the same plaintext twice
/// produces different blobs. Decryption of a tampered or wrong-key blob fails
/// with [`VaultError::Authentication`], never with altered plaintext.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob>;
    fn decrypt(&self, blob: &EncryptedBlob) -> Result<Vec<u8>>;
}

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// AES-256-GCM [`Cipher`] bound to the process-wide master key.
#[derive(Clone)]
pub struct AesGcmCipher {
    master_key: Arc<MasterKey>,
    rng: Arc<SystemRandom>,
}

impl AesGcmCipher {
    pub fn new(master_key: MasterKey) -> Self {
        Self { master_key: Arc::new(master_key), rng: Arc::new(SystemRandom::new()) }
    }

    /// Derive the per-blob subkey from the master key and the blob salt.
    fn derive_subkey(&self, salt: &[u8]) -> Result<[u8; 32]> {
        let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(self.master_key.as_bytes());
        let okm = prk
            .expand(&[BLOB_KEY_INFO], hkdf::HKDF_SHA256)
            .map_err(|_| VaultError::internal("Failed to derive blob encryption key"))?;
        let mut subkey = [0u8; 32];
        okm.fill(&mut subkey)
            .map_err(|_| VaultError::internal("Failed to derive blob encryption key"))?;
        Ok(subkey)
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob> {
        let mut salt = [0u8; SALT_SIZE];
        self.rng.fill(&mut salt).map_err(|_| {
            error!("Failed to generate random salt");
            VaultError::internal("Failed to generate random salt for encryption")
        })?;

        // Nonce is drawn from the CSPRNG immediately before sealing and used
        // for exactly one seal; it is never derived or reused.
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng.fill(&mut nonce_bytes).map_err(|_| {
            error!("Failed to generate random nonce");
            VaultError::internal("Failed to generate random nonce for encryption")
        })?;

        let subkey = self.derive_subkey(&salt)?;
        let unbound_key = UnboundKey::new(&AES_256_GCM, &subkey)
            .map_err(|_| VaultError::internal("Failed to create encryption key"))?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = plaintext.to_vec();
        buffer.reserve(TAG_SIZE);
        sealing_key.seal_in_place_append_tag(Aad::empty(), &mut buffer).map_err(|_| {
            error!("Encryption failed");
            VaultError::internal("Failed to encrypt secret value")
        })?;

        // ring appends the tag; keep it as a separate blob component.
        let tag = buffer.split_off(buffer.len() - TAG_SIZE);

        debug!(ciphertext_len = buffer.len(), "Encrypted secret value");

        Ok(EncryptedBlob {
            salt: salt.to_vec(),
            nonce: nonce_bytes.to_vec(),
            tag,
            ciphertext: buffer,
        })
    }

    fn decrypt(&self, blob: &EncryptedBlob) -> Result<Vec<u8>> {
        blob.validate()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&blob.nonce);

        let subkey = self.derive_subkey(&blob.salt)?;
        let unbound_key = UnboundKey::new(&AES_256_GCM, &subkey)
            .map_err(|_| VaultError::internal("Failed to create decryption key"))?;
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = Vec::with_capacity(blob.ciphertext.len() + TAG_SIZE);
        buffer.extend_from_slice(&blob.ciphertext);
        buffer.extend_from_slice(&blob.tag);

        // Tag verification is constant-time inside ring; every failure mode
        // maps to the same opaque error.
        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut buffer)
            .map_err(|_| VaultError::Authentication)?;

        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher").field("master_key", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::MasterKey;

    fn test_cipher() -> AesGcmCipher {
        AesGcmCipher::new(MasterKey::for_testing())
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let plaintext = b"wp-app-password-1234";

        let blob = cipher.encrypt(plaintext).unwrap();
        assert_eq!(blob.salt.len(), SALT_SIZE);
        assert_eq!(blob.nonce.len(), NONCE_SIZE);
        assert_eq!(blob.tag.len(), TAG_SIZE);
        assert_eq!(blob.ciphertext.len(), plaintext.len());

        let decrypted = cipher.decrypt(&blob).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_same_plaintext_produces_different_blobs() {
        let cipher = test_cipher();
        let plaintext = b"same-plaintext";

        let blob1 = cipher.encrypt(plaintext).unwrap();
        let blob2 = cipher.encrypt(plaintext).unwrap();

        assert_ne!(blob1.salt, blob2.salt);
        assert_ne!(blob1.nonce, blob2.nonce);
        assert_ne!(blob1.ciphertext, blob2.ciphertext);

        assert_eq!(cipher.decrypt(&blob1).unwrap(), plaintext);
        assert_eq!(cipher.decrypt(&blob2).unwrap(), plaintext);
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"sensitive-data").unwrap();
        blob.ciphertext[0] ^= 0x01;

        assert!(matches!(cipher.decrypt(&blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_tag_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"sensitive-data").unwrap();
        blob.tag[TAG_SIZE - 1] ^= 0x80;

        assert!(matches!(cipher.decrypt(&blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_nonce_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"sensitive-data").unwrap();
        blob.nonce[0] ^= 0xFF;

        assert!(matches!(cipher.decrypt(&blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_salt_fails_authentication() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"sensitive-data").unwrap();
        blob.salt[7] ^= 0x10;

        assert!(matches!(cipher.decrypt(&blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"sensitive-data").unwrap();

        let other = AesGcmCipher::new(MasterKey::from_bytes([0x24u8; 32]));
        assert!(matches!(other.decrypt(&blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_truncated_blob_rejected_as_malformed() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt(b"sensitive-data").unwrap();
        blob.tag.truncate(8);

        assert!(matches!(cipher.decrypt(&blob), Err(VaultError::Validation { .. })));
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"").unwrap();
        assert!(blob.ciphertext.is_empty());
        assert_eq!(cipher.decrypt(&blob).unwrap(), b"");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"round-trip-me").unwrap();

        let encoded = blob.encode();
        let decoded = EncryptedBlob::decode(&encoded).unwrap();
        assert_eq!(decoded, blob);
        assert_eq!(cipher.decrypt(&decoded).unwrap(), b"round-trip-me");
    }

    #[test]
    fn test_decode_rejects_missing_components() {
        assert!(EncryptedBlob::decode("onlyone").is_err());
        assert!(EncryptedBlob::decode("a:b:c").is_err());
        assert!(EncryptedBlob::decode("a:b:c:d:e").is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"x").unwrap();
        let encoded = blob.encode();
        let broken = format!("!!!:{}", encoded.splitn(2, ':').nth(1).unwrap());

        assert!(matches!(
            EncryptedBlob::decode(&broken),
            Err(VaultError::Validation { .. })
        ));
    }

    #[test]
    fn test_serde_as_wire_string() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"serialize-me").unwrap();

        let json = serde_json::to_string(&blob).unwrap();
        assert!(json.starts_with('"'));
        assert_eq!(json.matches(':').count(), 3);

        let back: EncryptedBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn roundtrip_preserves_any_plaintext(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
                let cipher = test_cipher();
                let blob = cipher.encrypt(&plaintext).unwrap();
                prop_assert_eq!(cipher.decrypt(&blob).unwrap(), plaintext);
            }

            #[test]
            fn flipping_any_ciphertext_byte_fails(
                plaintext in proptest::collection::vec(any::<u8>(), 1..128),
                flip in any::<usize>(),
            ) {
                let cipher = test_cipher();
                let mut blob = cipher.encrypt(&plaintext).unwrap();
                let idx = flip % blob.ciphertext.len();
                blob.ciphertext[idx] ^= 0x01;
                prop_assert!(matches!(cipher.decrypt(&blob), Err(VaultError::Authentication)));
            }
        }
    }
}
