//! # OAuth Token Lifecycle
//!
//! Keeps OAuth2 access tokens for long-lived integrations valid: proactive
//! refresh inside a configurable skew window, reactive refresh on 401 with a
//! single retry, and single-flight serialization of refreshes per
//! integration id.

mod manager;
mod provider;

pub use manager::TokenRefreshManager;
pub use provider::{TokenEndpointClient, TokenGrant};
