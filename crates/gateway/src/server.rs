use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{Query, State},
        response::{IntoResponse, Json, Redirect, Response},
        routing::get,
    },
    chrono::NaiveDate,
    serde::Deserialize,
    tracing::info,
};

use fitgate_oauth::{ConnectionState, TokenLifecycle};

use crate::error::{ApiError, bad_request};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    lifecycle: Arc<TokenLifecycle>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(lifecycle: Arc<TokenLifecycle>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/start", get(auth_start_handler))
        .route("/auth/callback", get(auth_callback_handler))
        .route("/profile", get(profile_handler))
        .route("/daily-summary", get(daily_summary_handler))
        .with_state(AppState { lifecycle })
}

/// Start the gateway HTTP server.
pub async fn start_gateway(
    bind: &str,
    port: u16,
    lifecycle: Arc<TokenLifecycle>,
) -> anyhow::Result<()> {
    let app = build_gateway_app(lifecycle);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "fitgate gateway v{} listening", env!("CARGO_PKG_VERSION"));

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connected = matches!(
        state.lifecycle.connection_state().await,
        Ok(ConnectionState::Connected { .. })
    );
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connected": connected,
    }))
}

/// Start the OAuth2 PKCE flow: redirect the user agent to the provider's
/// consent screen.
async fn auth_start_handler(State(state): State<AppState>) -> Redirect {
    let req = state.lifecycle.start();
    info!(state = %req.state, "authorization flow started");
    Redirect::temporary(&req.url)
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

/// The provider redirects here with `?code=...&state=...`; exchanges the
/// code for tokens and persists the refresh credential.
async fn auth_callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let (Some(code), Some(attempt_state)) = (params.code, params.state) else {
        return Ok(bad_request("missing code/state"));
    };

    let conn = state.lifecycle.complete(&code, &attempt_state).await?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "message": "Fitbit connected. You can now call /profile or /daily-summary.",
        "scope": conn.scope,
        "subjectId": conn.user_id,
    }))
    .into_response())
}

async fn profile_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = state
        .lifecycle
        .authenticated_get("/1/user/-/profile.json", &[])
        .await?;
    Ok(Json(body))
}

#[derive(Deserialize)]
struct DailySummaryParams {
    /// YYYY-MM-DD; defaults to today.
    day: Option<String>,
}

async fn daily_summary_handler(
    State(state): State<AppState>,
    Query(params): Query<DailySummaryParams>,
) -> Result<Response, ApiError> {
    let day = match params.day {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(day) => day,
            Err(_) => return Ok(bad_request("day must be YYYY-MM-DD")),
        },
        None => chrono::Utc::now().date_naive(),
    };

    // One refresh covers all three resource calls.
    let token = state.lifecycle.fresh_access_token().await?;
    let client = state.lifecycle.client();

    let activity = client
        .api_get(&token, &format!("/1/user/-/activities/date/{day}.json"), &[])
        .await?;
    let sleep = client
        .api_get(&token, &format!("/1.2/user/-/sleep/date/{day}.json"), &[])
        .await?;
    let heartrate = client
        .api_get(
            &token,
            &format!("/1/user/-/activities/heart/date/{day}/1d.json"),
            &[],
        )
        .await?;

    Ok(Json(serde_json::json!({
        "date": day.to_string(),
        "activity": activity,
        "sleep": sleep,
        "heartrate": heartrate,
    }))
    .into_response())
}
