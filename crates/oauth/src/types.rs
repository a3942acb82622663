//! Provider configuration and exchange result types.

use {
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
};

/// Registered OAuth client settings for the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    /// Base URL for authenticated resource calls.
    pub api_base: String,
    pub redirect_uri: String,
    /// Space-delimited capability set requested at authorization.
    pub scope: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            auth_url: "https://www.fitbit.com/oauth2/authorize".into(),
            token_url: "https://api.fitbit.com/oauth2/token".into(),
            api_base: "https://api.fitbit.com".into(),
            redirect_uri: "http://localhost:8080/auth/callback".into(),
            scope: "activity heartrate sleep profile weight".into(),
        }
    }
}

/// The result of one token-endpoint exchange.
///
/// Transient: held in memory for the duration of a single request, never
/// persisted as a whole. The token fields are wrapped so a stray `Debug`
/// log prints `[REDACTED]` instead of the credential.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_in: u64,
    pub scope: String,
    /// Opaque external user identifier (Fitbit `user_id`).
    pub user_id: String,
}
