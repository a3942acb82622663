//! Credential lifecycle for a single delegated Fitbit identity.
//!
//! Implements the OAuth2 authorization-code-with-PKCE grant and keeps the
//! durable refresh credential rotated on every use. Access tokens are only
//! ever held in memory; the refresh token lives in a versioned
//! [`fitgate_vault::SecretVault`] slot.

pub mod client;
pub mod error;
pub mod lifecycle;
pub mod pkce;
pub mod state;
pub mod types;

pub use {
    client::ExchangeClient,
    error::AuthError,
    lifecycle::{AuthRequest, Connection, ConnectionState, TokenLifecycle},
    state::PkceStateStore,
    types::{CredentialSet, ProviderConfig},
};
