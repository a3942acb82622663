//! Token lifecycle orchestrator: composes PKCE state, the exchange client
//! and the secret vault into the three operations the rest of the system
//! uses — start a connection, complete it on callback, and produce a
//! currently valid access token on demand.
//!
//! The Connected/Disconnected lifecycle is not stored anywhere: it is
//! derived from whether the vault's refresh slot has a value, and every
//! transition decision lives in this module.

use std::{sync::Arc, time::Duration};

use {
    secrecy::SecretString,
    tracing::{debug, info, warn},
};

use fitgate_vault::{SecretVault, SecretVersion, VaultError};

use crate::{
    client::ExchangeClient,
    error::AuthError,
    pkce,
    state::PkceStateStore,
    types::{CredentialSet, ProviderConfig},
};

/// Vault slot holding the current refresh credential.
pub const REFRESH_SLOT: &str = "fitbit-refresh-token";

/// A freshly started authorization attempt.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Provider authorization URL the user agent must be redirected to.
    pub url: String,
    pub state: String,
}

/// Outcome of a completed connection, safe to show to the caller.
#[derive(Debug, Clone)]
pub struct Connection {
    pub scope: String,
    pub user_id: String,
}

/// Lifecycle state of the single delegated identity, derived from the
/// refresh slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected { version: u64 },
}

pub struct TokenLifecycle {
    client: ExchangeClient,
    pending: PkceStateStore,
    vault: Arc<dyn SecretVault>,
    authorize_url: url::Url,
}

impl TokenLifecycle {
    pub fn new(
        provider: ProviderConfig,
        vault: Arc<dyn SecretVault>,
        attempt_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let authorize_url = url::Url::parse(&provider.auth_url)
            .map_err(|e| anyhow::anyhow!("invalid auth_url {:?}: {e}", provider.auth_url))?;
        Ok(Self {
            client: ExchangeClient::new(provider)?,
            pending: PkceStateStore::new(attempt_ttl),
            vault,
            authorize_url,
        })
    }

    /// The protocol client, for resource calls once a token is in hand.
    pub fn client(&self) -> &ExchangeClient {
        &self.client
    }

    /// Begin an authorization attempt: mint a verifier/challenge pair,
    /// register the attempt, and build the consent redirect target.
    ///
    /// No state transition happens here — the identity is not connected
    /// until the callback completes.
    pub fn start(&self) -> AuthRequest {
        let verifier = pkce::generate_verifier();
        let challenge = pkce::derive_challenge(&verifier);
        let state = self.pending.create(verifier);

        let provider = self.client.provider();
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &provider.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &provider.scope)
            .append_pair("redirect_uri", &provider.redirect_uri)
            .append_pair("state", &state)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        debug!(state, "authorization attempt registered");
        AuthRequest {
            url: url.into(),
            state,
        }
    }

    /// Complete the handshake after the provider's callback.
    ///
    /// The attempt is consumed before the exchange, so a failed exchange is
    /// never retried with the same state — the caller restarts at
    /// [`start`](Self::start).
    pub async fn complete(&self, code: &str, state: &str) -> Result<Connection, AuthError> {
        let verifier = self.pending.consume(state)?;
        let creds = self.client.exchange_code(code, &verifier).await?;
        let version = self.rotate(&creds).await?;

        info!(version, scope = %creds.scope, "identity connected");
        Ok(Connection {
            scope: creds.scope,
            user_id: creds.user_id,
        })
    }

    /// Produce a currently valid access token.
    ///
    /// Reads the latest refresh credential, exchanges it, and writes the
    /// rotated replacement back as a new vault version *before* the access
    /// token is released, so a crash cannot widen the window in which the
    /// stored credential is already invalidated.
    ///
    /// A credential-invalid rejection may be a concurrent-rotation race
    /// (another call already spent this refresh token), so the latest
    /// version is re-read and the exchange retried exactly once; a second
    /// rejection means the identity is disconnected.
    pub async fn fresh_access_token(&self) -> Result<SecretString, AuthError> {
        let latest = self.read_refresh_slot().await?;
        match self.refresh_and_rotate(&latest).await {
            Err(e) if e.credential_invalid() => {
                debug!(
                    version = latest.version,
                    "refresh rejected; re-reading slot for possible concurrent rotation"
                );
                let retry = self.read_refresh_slot().await?;
                match self.refresh_and_rotate(&retry).await {
                    Err(e) if e.credential_invalid() => {
                        warn!(
                            version = retry.version,
                            "refresh credential invalid; identity disconnected"
                        );
                        Err(AuthError::NotConnected)
                    },
                    other => other,
                }
            },
            other => other,
        }
    }

    /// Fetch a resource path with a freshly refreshed access token.
    pub async fn authenticated_get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, AuthError> {
        let token = self.fresh_access_token().await?;
        self.client.api_get(&token, path, params).await
    }

    /// Current lifecycle state, derived from the refresh slot.
    pub async fn connection_state(&self) -> Result<ConnectionState, AuthError> {
        match self.vault.read_latest(REFRESH_SLOT).await {
            Ok(v) => Ok(ConnectionState::Connected { version: v.version }),
            Err(VaultError::NotFound(_)) => Ok(ConnectionState::Disconnected),
            Err(VaultError::Unavailable(e)) => Err(AuthError::SecretUnavailable(e)),
        }
    }

    async fn refresh_and_rotate(
        &self,
        stored: &SecretVersion,
    ) -> Result<SecretString, AuthError> {
        let refresh = SecretString::new(stored.value.clone());
        let creds = self.client.exchange_refresh(&refresh).await?;
        // Rotation must land before the access token leaves this function.
        let version = self.rotate(&creds).await?;
        debug!(from = stored.version, to = version, "refresh credential rotated");
        Ok(creds.access_token)
    }

    async fn rotate(&self, creds: &CredentialSet) -> Result<u64, AuthError> {
        use secrecy::ExposeSecret;
        self.vault
            .write_new_version(REFRESH_SLOT, creds.refresh_token.expose_secret())
            .await
            .map_err(|e| AuthError::SecretUnavailable(e.to_string()))
    }

    async fn read_refresh_slot(&self) -> Result<SecretVersion, AuthError> {
        match self.vault.read_latest(REFRESH_SLOT).await {
            Ok(v) => Ok(v),
            Err(VaultError::NotFound(_)) => Err(AuthError::NotConnected),
            Err(VaultError::Unavailable(e)) => Err(AuthError::SecretUnavailable(e)),
        }
    }
}
