//! End-to-end exercise of the HTTP boundary: consent redirect, callback
//! exchange, and refresh-rotate-serve, against a stubbed provider.

use std::{sync::Arc, time::Duration};

use {mockito::Matcher, url::Url};

use {
    fitgate_gateway::build_gateway_app,
    fitgate_oauth::{ProviderConfig, TokenLifecycle, lifecycle::REFRESH_SLOT},
    fitgate_vault::{MemoryVault, SecretVault},
};

struct TestGateway {
    base: String,
    vault: Arc<MemoryVault>,
    http: reqwest::Client,
}

async fn spawn_gateway(provider_base: &str) -> TestGateway {
    let provider = ProviderConfig {
        client_id: "CID".into(),
        auth_url: format!("{provider_base}/oauth2/authorize"),
        token_url: format!("{provider_base}/oauth2/token"),
        api_base: provider_base.to_string(),
        redirect_uri: "http://localhost:0/auth/callback".into(),
        scope: "activity".into(),
    };

    let vault = Arc::new(MemoryVault::new());
    let lifecycle = Arc::new(
        TokenLifecycle::new(
            provider,
            Arc::clone(&vault) as Arc<dyn SecretVault>,
            Duration::from_secs(600),
        )
        .unwrap(),
    );

    let app = build_gateway_app(lifecycle);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Redirects stay visible to assertions.
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestGateway {
        base: format!("http://{addr}"),
        vault,
        http,
    }
}

fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn full_connect_and_refresh_flow() {
    let mut provider = mockito::Server::new_async().await;
    let gw = spawn_gateway(&provider.url()).await;

    // 1. /auth/start redirects to the provider consent screen.
    let resp = gw
        .http
        .get(format!("{}/auth/start", gw.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 307);
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(location.starts_with(&format!("{}/oauth2/authorize", provider.url())));
    assert_eq!(
        query_param(&location, "code_challenge_method").as_deref(),
        Some("S256")
    );
    let state = query_param(&location, "state").unwrap();

    // 2. Callback exchanges the code and persists the refresh token.
    let code_exchange = provider
        .mock("POST", "/oauth2/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "authorization_code".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"A1","refresh_token":"R1","expires_in":3600,
               "scope":"activity","user_id":"u1"}"#,
        )
        .create_async()
        .await;

    let resp = gw
        .http
        .get(format!(
            "{}/auth/callback?code=abc&state={state}",
            gw.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["scope"], "activity");
    assert_eq!(body["subjectId"], "u1");
    code_exchange.assert_async().await;

    let latest = gw.vault.read_latest(REFRESH_SLOT).await.unwrap();
    assert_eq!(latest.value, "R1");

    // 3. /profile refreshes, rotates the slot, and proxies the resource.
    let refresh_exchange = provider
        .mock("POST", "/oauth2/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "R1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"A2","refresh_token":"R2","expires_in":28800}"#)
        .create_async()
        .await;
    let profile = provider
        .mock("GET", "/1/user/-/profile.json")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"user":{"encodedId":"u1","displayName":"Test"}}"#)
        .create_async()
        .await;

    let resp = gw
        .http
        .get(format!("{}/profile", gw.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["encodedId"], "u1");
    refresh_exchange.assert_async().await;
    profile.assert_async().await;

    let latest = gw.vault.read_latest(REFRESH_SLOT).await.unwrap();
    assert_eq!(latest.value, "R2");
    assert_eq!(latest.version, 2);
}

#[tokio::test]
async fn callback_rejects_missing_and_forged_params() {
    let provider = mockito::Server::new_async().await;
    let gw = spawn_gateway(&provider.url()).await;

    let resp = gw
        .http
        .get(format!("{}/auth/callback", gw.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = gw
        .http
        .get(format!("{}/auth/callback?code=abc&state=forged", gw.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(gw.vault.version_count(REFRESH_SLOT).await, 0);
}

#[tokio::test]
async fn profile_before_connecting_is_actionable_400() {
    let provider = mockito::Server::new_async().await;
    let gw = spawn_gateway(&provider.url()).await;

    let resp = gw
        .http
        .get(format!("{}/profile", gw.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("authorization flow"), "got: {msg}");
}

#[tokio::test]
async fn health_reports_connection_state() {
    let provider = mockito::Server::new_async().await;
    let gw = spawn_gateway(&provider.url()).await;

    let body: serde_json::Value = gw
        .http
        .get(format!("{}/health", gw.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected"], false);

    gw.vault.write_new_version(REFRESH_SLOT, "R1").await.unwrap();
    let body: serde_json::Value = gw
        .http
        .get(format!("{}/health", gw.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["connected"], true);
}

#[tokio::test]
async fn daily_summary_validates_the_day_parameter() {
    let provider = mockito::Server::new_async().await;
    let gw = spawn_gateway(&provider.url()).await;

    let resp = gw
        .http
        .get(format!("{}/daily-summary?day=not-a-date", gw.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
