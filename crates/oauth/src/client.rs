//! Stateless protocol client for the provider's token and resource
//! endpoints. Holds only the registered client id and redirect target;
//! retries are never taken here — that decision belongs to the
//! orchestrator.

use std::time::Duration;

use {
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    error::AuthError,
    types::{CredentialSet, ProviderConfig},
};

/// Hard bound on every upstream call.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for the three OAuth exchanges: code-for-tokens,
/// refresh-for-tokens, and authenticated resource GETs.
pub struct ExchangeClient {
    http: reqwest::Client,
    provider: ProviderConfig,
}

/// Wire shape of the provider's token endpoint response. Field presence is
/// validated before conversion into a [`CredentialSet`].
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    user_id: String,
}

impl ExchangeClient {
    pub fn new(provider: ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self { http, provider })
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Exchange an authorization code plus its PKCE verifier for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<CredentialSet, AuthError> {
        self.token_request(&[
            ("client_id", self.provider.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.provider.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ])
        .await
    }

    /// Exchange a refresh token for a fresh credential set.
    ///
    /// The provider rotates the grant: the refresh token in the response
    /// replaces the one supplied here, which must be assumed dead.
    pub async fn exchange_refresh(
        &self,
        refresh_token: &SecretString,
    ) -> Result<CredentialSet, AuthError> {
        self.token_request(&[
            ("client_id", self.provider.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ])
        .await
    }

    /// Authenticated GET against a provider resource endpoint.
    pub async fn api_get(
        &self,
        access_token: &SecretString,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, AuthError> {
        let url = format!("{}{path}", self.provider.api_base);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .bearer_auth(access_token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            // Commonly an expired or revoked access token.
            debug!(%status, path, "resource call rejected");
            return Err(AuthError::UpstreamRejected {
                status: status.as_u16(),
            });
        }
        resp.json()
            .await
            .map_err(|_| AuthError::MalformedResponse("resource body is not JSON".into()))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<CredentialSet, AuthError> {
        let resp = self
            .http
            .post(&self.provider.token_url)
            .form(form)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, "token endpoint rejected exchange");
            return Err(AuthError::UpstreamRejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|_| AuthError::MalformedResponse("token body is not JSON".into()))?;
        body.try_into()
    }
}

impl TryFrom<TokenResponse> for CredentialSet {
    type Error = AuthError;

    fn try_from(body: TokenResponse) -> Result<Self, AuthError> {
        let missing = |field: &str| AuthError::MalformedResponse(format!("missing {field}"));
        Ok(Self {
            access_token: SecretString::new(body.access_token.ok_or(missing("access_token"))?),
            refresh_token: SecretString::new(body.refresh_token.ok_or(missing("refresh_token"))?),
            expires_in: body.expires_in.ok_or(missing("expires_in"))?,
            scope: body.scope,
            user_id: body.user_id,
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::UpstreamTimeout
    } else {
        AuthError::UpstreamUnreachable(e.to_string())
    }
}
