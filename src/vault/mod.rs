//! # Credential Vault
//!
//! Stores third-party platform credentials per (tenant, platform) pair.
//! Sensitive sub-fields are encrypted before they reach storage; they come
//! back out in exactly two shapes: boolean presence flags for general
//! callers, or decrypted plaintext through the separate, audited
//! [`CredentialVault::fetch_revealed`] path.

mod service;

pub use service::{CredentialVault, MaskedCredential, RevealedCredential};
