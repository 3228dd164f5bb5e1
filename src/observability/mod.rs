//! # Observability
//!
//! Structured logging for the vault using the tracing ecosystem. Secret
//! material is never logged; repository and service spans carry identifiers
//! only.

use crate::errors::{Result, VaultError};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set, falling back to the given default filter
/// directive (e.g. `"keywarden=info"`). Returns an error when a subscriber
/// is already installed.
pub fn init_tracing(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| {
            VaultError::config(format!("Failed to initialize tracing subscriber: {}", e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // First call may or may not win depending on test ordering; the
        // second call must report the conflict instead of panicking.
        let _ = init_tracing("keywarden=info");
        assert!(init_tracing("keywarden=debug").is_err());
    }
}
