//! End-to-end session flows against a local stub of the CRM API.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use leadcrm_application::{SessionError, TOKEN_STORAGE_KEY};
use leadcrm_domain::{ApiRequest, Credentials, TokenStatus};
use leadcrm_infrastructure::{SessionConfig, build_session_manager};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

const LOGIN_LIFETIME_SECS: i64 = 3600;

fn jwt(lifetime_secs: i64, sub: &str) -> String {
    let exp = Utc::now().timestamp() + lifetime_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"exp": exp, "sub": sub}).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

#[derive(Default)]
struct Stub {
    issued: Mutex<HashSet<String>>,
    logins: AtomicUsize,
    refreshes: AtomicUsize,
    logouts: AtomicUsize,
    seen_request_ids: Mutex<Vec<String>>,
}

impl Stub {
    fn issue(&self, lifetime_secs: i64, sub: &str) -> String {
        let token = jwt(lifetime_secs, sub);
        self.issued.lock().unwrap().insert(token.clone());
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get("authorization")?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .to_string();
        self.issued.lock().unwrap().contains(&token).then_some(token)
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "error": "Invalid token"})),
    )
}

fn ada() -> Value {
    json!({"id": 7, "username": "ada", "name": "Ada Lovelace", "role": "admin"})
}

async fn login(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> impl IntoResponse {
    stub.logins.fetch_add(1, Ordering::SeqCst);
    if body["username"] == "ada" && body["password"] == "secret" {
        let token = stub.issue(LOGIN_LIFETIME_SECS, "ada");
        return (
            StatusCode::OK,
            Json(json!({"success": true, "token": token, "user": ada(), "firstLogin": false})),
        );
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "error": "Invalid credentials"})),
    )
}

async fn refresh(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> impl IntoResponse {
    stub.refreshes.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    if stub.authorized(&headers).is_none() {
        return unauthorized();
    }
    let token = stub.issue(86_400, "ada-refreshed");
    (StatusCode::OK, Json(json!({"success": true, "token": token})))
}

async fn logout(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> impl IntoResponse {
    stub.logouts.fetch_add(1, Ordering::SeqCst);
    if let Some(token) = stub.authorized(&headers) {
        stub.issued.lock().unwrap().remove(&token);
    }
    Json(json!({"success": true}))
}

async fn me(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> impl IntoResponse {
    if stub.authorized(&headers).is_none() {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({"success": true, "user": ada()})))
}

async fn leads(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if stub.authorized(&headers).is_none() {
        return unauthorized();
    }
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        stub.seen_request_ids.lock().unwrap().push(id.to_string());
    }
    (
        StatusCode::OK,
        Json(json!({"leads": [{"id": 1, "name": "Acme"}], "status": query.get("status")})),
    )
}

async fn broken(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> impl IntoResponse {
    if stub.authorized(&headers).is_none() {
        return unauthorized();
    }
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"success": false, "message": "Lead name is required"})),
    )
}

struct Fixture {
    stub: Arc<Stub>,
    config: SessionConfig,
    dir: TempDir,
}

impl Fixture {
    async fn start() -> Self {
        let stub = Arc::new(Stub::default());

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/me", get(me))
            .route("/api/leads", get(leads).post(broken))
            .with_state(Arc::clone(&stub));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            api_base_url: format!("http://{addr}/api"),
            request_timeout_secs: 5,
            logout_timeout_secs: 1,
            storage_path: Some(dir.path().join("session.json")),
            ..SessionConfig::default()
        };
        Self { stub, config, dir }
    }

    fn token_file(&self) -> Value {
        let path = self.dir.path().join("session.json");
        read_json(&path)
    }
}

fn read_json(path: &Path) -> Value {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap(),
        Err(_) => json!({}),
    }
}

#[tokio::test]
async fn test_login_then_authorized_request() {
    let fixture = Fixture::start().await;
    let manager = build_session_manager(&fixture.config).unwrap();

    let success = manager
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap();
    assert_eq!(success.user.name.as_deref(), Some("Ada Lovelace"));
    assert!(!success.first_login);
    assert!(manager.is_authenticated());

    let stored = fixture.token_file();
    assert!(stored[TOKEN_STORAGE_KEY].as_str().is_some());

    let response = manager
        .execute(ApiRequest::get("/leads").with_query("status", "open"))
        .await
        .unwrap();
    let body: Value = response.json().unwrap();
    assert_eq!(body["leads"][0]["name"], "Acme");
    assert_eq!(body["status"], "open");

    assert_eq!(fixture.stub.refreshes.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.stub.seen_request_ids.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_login_leaves_no_session() {
    let fixture = Fixture::start().await;
    let manager = build_session_manager(&fixture.config).unwrap();

    let error = manager
        .login(&Credentials::new("ada", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(&error, SessionError::LoginRejected(m) if m == "Invalid credentials"));
    assert_eq!(fixture.stub.logins.load(Ordering::SeqCst), 1);
    assert!(!manager.is_authenticated());
    assert_eq!(fixture.token_file().get(TOKEN_STORAGE_KEY), None);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let fixture = Fixture::start().await;
    // Login tokens live one hour, inside a two-hour refresh window.
    let config = SessionConfig {
        expiring_soon_threshold_secs: 7200,
        ..fixture.config.clone()
    };
    let manager = build_session_manager(&config).unwrap();
    manager
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap();
    let before = manager.token().await.unwrap().unwrap();

    let (first, second) = tokio::join!(
        manager.execute(ApiRequest::get("/leads")),
        manager.execute(ApiRequest::get("/leads")),
    );

    assert!(first.unwrap().is_success());
    assert!(second.unwrap().is_success());
    assert_eq!(fixture.stub.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(manager.refresh_calls(), 1);

    let after = manager.token().await.unwrap().unwrap();
    assert_ne!(before, after);
    assert_eq!(
        fixture.token_file()[TOKEN_STORAGE_KEY].as_str(),
        Some(after.as_str())
    );
    assert!(matches!(
        manager.token_status().await.unwrap(),
        TokenStatus::Valid { .. }
    ));
}

#[tokio::test]
async fn test_restore_from_token_file() {
    let fixture = Fixture::start().await;
    let first = build_session_manager(&fixture.config).unwrap();
    first
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap();
    drop(first);

    let restarted = build_session_manager(&fixture.config).unwrap();
    assert!(!restarted.is_authenticated());

    let user = restarted.restore().await.unwrap().unwrap();

    assert_eq!(user.username.as_deref(), Some("ada"));
    assert!(restarted.is_authenticated());
    assert!(!restarted.session().is_loading);
}

#[tokio::test]
async fn test_revoked_token_clears_session() {
    let fixture = Fixture::start().await;
    let manager = build_session_manager(&fixture.config).unwrap();
    manager
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap();
    fixture.stub.issued.lock().unwrap().clear();

    let error = manager.execute(ApiRequest::get("/leads")).await.unwrap_err();

    assert!(matches!(error, SessionError::Unauthorized));
    assert!(!manager.is_authenticated());
    assert_eq!(manager.token().await.unwrap(), None);
    assert_eq!(fixture.token_file().get(TOKEN_STORAGE_KEY), None);
}

#[tokio::test]
async fn test_server_error_is_normalized() {
    let fixture = Fixture::start().await;
    let manager = build_session_manager(&fixture.config).unwrap();
    manager
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap();

    let error = manager
        .execute(ApiRequest::post("/leads").with_json_value(json!({"name": ""})))
        .await
        .unwrap_err();

    assert_eq!(
        error.envelope(),
        json!({
            "success": false,
            "error": "server error (422): Lead name is required",
            "code": "server_error",
        })
    );
    assert!(manager.is_authenticated());
}

#[tokio::test]
async fn test_logout_revokes_and_removes_token() {
    let fixture = Fixture::start().await;
    let manager = build_session_manager(&fixture.config).unwrap();
    manager
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap();

    manager.logout().await.unwrap();

    assert_eq!(fixture.stub.logouts.load(Ordering::SeqCst), 1);
    assert!(fixture.stub.issued.lock().unwrap().is_empty());
    assert!(!manager.is_authenticated());
    assert_eq!(fixture.token_file().get(TOKEN_STORAGE_KEY), None);
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        api_base_url: format!("http://{addr}/api"),
        request_timeout_secs: 2,
        storage_path: Some(dir.path().join("session.json")),
        ..SessionConfig::default()
    };
    let manager = build_session_manager(&config).unwrap();

    let error = manager
        .login(&Credentials::new("ada", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(error, SessionError::Transport(_)));
    assert_eq!(error.code(), "network_error");
    assert!(!manager.is_authenticated());
}
