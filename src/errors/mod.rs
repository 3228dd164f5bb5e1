//! # Error Handling
//!
//! Error types for the keywarden vault using `thiserror`.

mod types;

pub use types::{Result, VaultError};
