//! Gateway: HTTP surface over the credential lifecycle.
//!
//! Routes:
//! - `/auth/start`, `/auth/callback` — the OAuth2+PKCE handshake boundary
//! - `/profile`, `/daily-summary` — read-only Fitbit convenience calls
//! - `/health` — liveness and connection state
//!
//! All credential logic lives in `fitgate-oauth`; handlers here only parse
//! parameters, call the orchestrator and map its typed errors onto HTTP
//! statuses.

pub mod error;
pub mod server;

pub use server::{build_gateway_app, start_gateway};
