//! Maps the lifecycle error taxonomy onto HTTP responses.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::warn,
};

use fitgate_oauth::AuthError;

/// Wrapper so handlers can return `Result<_, ApiError>` with `?`.
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            // User-actionable: restart the flow at /auth/start.
            AuthError::InvalidOrExpiredState | AuthError::NotConnected => StatusCode::BAD_REQUEST,
            AuthError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            AuthError::UpstreamRejected { .. }
            | AuthError::UpstreamUnreachable(_)
            | AuthError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AuthError::SecretUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        (
            status,
            Json(serde_json::json!({ "ok": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// 400 with a plain message, for missing/malformed request parameters.
pub fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "ok": false, "error": msg })),
    )
        .into_response()
}
