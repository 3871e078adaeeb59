//! Test doubles shared by the session integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use leadcrm_application::ports::{
    Clock, HttpTransport, InMemoryKeyValueStore, KeyValueStore, StorageError, TransportError,
    TransportFuture,
};
use leadcrm_application::{SessionManager, TOKEN_STORAGE_KEY};
use leadcrm_domain::{AccessToken, ApiRequest, ApiResponse, HttpMethod};
use serde_json::{Value, json};

/// Instant every test treats as "now".
pub const NOW: i64 = 1_760_000_000;

/// Builds an unsigned JWT whose payload carries `exp`.
pub fn jwt(exp: i64) -> String {
    jwt_with(exp, "user-1")
}

/// Builds an unsigned JWT with a distinguishing subject.
pub fn jwt_with(exp: i64, sub: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"exp": exp, "sub": sub}).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// A clock pinned to a settable instant.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(secs: i64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(DateTime::from_timestamp(secs, 0).unwrap())))
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Clone)]
enum Reply {
    Respond(ApiResponse),
    Fail(TransportError),
}

#[derive(Clone)]
struct Route {
    reply: Reply,
    delay: Duration,
}

/// Transport answering from a per-route script and recording every call.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(HttpMethod, String), Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers `method path` with a JSON body.
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.respond_after(method, path, status, body, Duration::ZERO);
    }

    /// Answers `method path` with a JSON body after `delay`.
    pub fn respond_after(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: Value,
        delay: Duration,
    ) {
        self.route(
            method,
            path,
            Route {
                reply: Reply::Respond(ApiResponse::json_body(status, &body)),
                delay,
            },
        );
    }

    /// Fails `method path` with a transport error after `delay`.
    pub fn fail(&self, method: HttpMethod, path: &str, error: TransportError, delay: Duration) {
        self.route(
            method,
            path,
            Route {
                reply: Reply::Fail(error),
                delay,
            },
        );
    }

    fn route(&self, method: HttpMethod, path: &str, route: Route) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), route);
    }

    /// Every request sent so far.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests sent to `path`.
    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls_to(path).len()
    }
}

impl HttpTransport for FakeTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
        self.calls.lock().unwrap().push(request.clone());
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method, request.path.clone()))
            .cloned();

        Box::pin(async move {
            let Some(route) = route else {
                return Ok(ApiResponse::json_body(404, &json!({"error": "no route"})));
            };
            if !route.delay.is_zero() {
                tokio::time::sleep(route.delay).await;
            }
            match route.reply {
                Reply::Respond(response) => Ok(response),
                Reply::Fail(error) => Err(error),
            }
        })
    }
}

/// Storage whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryKeyValueStore,
    fail_writes: Mutex<bool>,
}

impl FlakyStore {
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    fn check(&self) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.remove(key).await
    }
}

/// A manager over fakes, plus handles to inspect them.
pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub transport: Arc<FakeTransport>,
    pub storage: Arc<InMemoryKeyValueStore>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = FakeTransport::new();
        let storage = Arc::new(InMemoryKeyValueStore::new());
        let clock = FixedClock::at(NOW);
        let manager = SessionManager::builder(transport.clone(), storage.clone(), clock.clone())
            .logout_timeout(Duration::from_millis(200))
            .build();
        Self {
            manager: Arc::new(manager),
            transport,
            storage,
            clock,
        }
    }

    /// Stores a token as if a previous run had logged in.
    pub async fn store_token(&self, token: &str) {
        self.storage.set(TOKEN_STORAGE_KEY, token).await.unwrap();
    }

    pub async fn stored_token(&self) -> Option<AccessToken> {
        self.manager.token().await.unwrap()
    }

    /// Scripts a successful login answering with `token` for user `id`.
    pub fn script_login(&self, token: &str, id: i64, first_login: bool) {
        self.transport.respond(
            HttpMethod::Post,
            "/auth/login",
            200,
            json!({
                "success": true,
                "token": token,
                "user": {"id": id, "username": format!("user{id}"), "role": "agent"},
                "firstLogin": first_login
            }),
        );
    }
}
