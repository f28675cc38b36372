//! Runs the real server on an ephemeral port and talks to it over HTTP.

use anyhow::{Context, Result};
use groups::api;
use groups::auth::{AuthConfig, AuthService};
use groups::clock::SystemClock;
use reqwest::{header, redirect, Client, StatusCode};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

impl TestServer {
    async fn start() -> Result<Self> {
        let config = AuthConfig::new()
            .with_argon2_memory_kib(1024)
            .with_argon2_iterations(1)
            .with_session_sweep_seconds(1);
        let auth = Arc::new(AuthService::in_memory(config, Arc::new(SystemClock))?);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(api::serve(listener, auth, async {
            let _ = rx.await;
        }));

        Ok(Self {
            addr,
            shutdown: Some(tx),
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.context("server task panicked")?
    }
}

fn client() -> Result<Client> {
    Ok(Client::builder()
        .redirect(redirect::Policy::none())
        .user_agent(api::APP_USER_AGENT)
        .build()?)
}

/// The `name=value` pair of the first `Set-Cookie` called `name`.
fn cookie_pair(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

#[tokio::test]
async fn register_login_gate_logout() -> Result<()> {
    let server = TestServer::start().await?;
    let client = client()?;
    let credentials = json!({ "email": "test@example.com", "password": "password123" });

    let response = client
        .post(server.url("/auth/register"))
        .json(&credentials)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": "TEST@example.com", "password": "password123" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Email already registered");

    // anonymous
    let response = client.get(server.url("/me")).send().await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/login")
    );
    let next = cookie_pair(&response, "groups_next").context("missing next cookie")?;

    let response = client
        .post(server.url("/auth/login"))
        .header(header::COOKIE, next)
        .json(&credentials)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let session = cookie_pair(&response, "groups_session").context("missing session cookie")?;
    let body: Value = response.json().await?;
    assert_eq!(body["ok"], true);
    assert_eq!(body["redirect"], "/me");
    let token = body["token"].as_str().context("missing token")?.to_string();

    let response = client
        .get(server.url("/me"))
        .header(header::COOKIE, &session)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["email"], "test@example.com");

    let response = client
        .get(server.url("/me"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(server.url("/auth/logout"))
        .header(header::COOKIE, &session)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(server.url("/me"))
        .header(header::COOKIE, &session)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FOUND);

    server.stop().await
}

#[tokio::test]
async fn failed_logins_are_indistinguishable() -> Result<()> {
    let server = TestServer::start().await?;
    let client = client()?;

    client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": "test@example.com", "password": "password123" }))
        .send()
        .await?
        .error_for_status()?;

    let wrong = client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "test@example.com", "password": "wrong-password" }))
        .send()
        .await?;
    let unknown = client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .send()
        .await?;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert!(cookie_pair(&wrong, "groups_session").is_none());

    let wrong: Value = wrong.json().await?;
    let unknown: Value = unknown.json().await?;
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["error"], "Invalid email or password");

    server.stop().await
}

#[tokio::test]
async fn health_reports_store_and_request_id() -> Result<()> {
    let server = TestServer::start().await?;
    let client = client()?;

    let response = client
        .get(server.url("/health"))
        .header("x-request-id", "test-request")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("test-request")
    );
    assert!(response.headers().contains_key("x-app"));

    let body: Value = response.json().await?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["store"], "ok");

    server.stop().await
}
