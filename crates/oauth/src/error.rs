//! Typed failure taxonomy for the credential lifecycle.
//!
//! Every failure a caller can see is one of these variants; raw provider
//! errors never escape. Handlers map variants onto HTTP statuses.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The state token is unknown, already consumed, or past its TTL.
    /// Deliberately indistinguishable cases: the flow must be restarted.
    #[error("invalid or expired authorization state")]
    InvalidOrExpiredState,

    /// No usable refresh credential is stored. The flow must be restarted.
    #[error("no identity connected; start the authorization flow first")]
    NotConnected,

    /// The provider answered with a non-2xx status.
    #[error("provider rejected the request (http {status})")]
    UpstreamRejected { status: u16 },

    /// The provider could not be reached at all (DNS, connect, TLS).
    #[error("provider unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The provider did not answer within the request deadline.
    #[error("provider request timed out")]
    UpstreamTimeout,

    /// The provider answered 2xx but violated its own response contract.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// The durable secret store could not serve the request. Transient.
    #[error("secret store unavailable: {0}")]
    SecretUnavailable(String),
}

impl AuthError {
    /// True when an upstream rejection indicates the presented credential
    /// (authorization code or refresh token) is itself invalid, rather than
    /// a transient provider problem.
    pub fn credential_invalid(&self) -> bool {
        matches!(self, Self::UpstreamRejected { status: 400 | 401 })
    }
}
