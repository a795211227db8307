//! Mock authorization server for tests
//!
//! Binds an axum router to `127.0.0.1:0` exposing the token, userinfo and
//! registration endpoints. Replies are configurable per test and every hit
//! is counted so tests can assert on request volume.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Json, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::net::TcpListener;

use crate::config::ClientConfig;

/// Build a JWT-shaped token around `payload` (unsigned, for decoding tests).
pub(crate) fn jwt(payload: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

#[derive(Clone)]
pub(crate) struct TokenReply {
    status: StatusCode,
    body: String,
}

impl TokenReply {
    pub(crate) fn ok(access_token: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: serde_json::json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 300,
            })
            .to_string(),
        }
    }

    pub(crate) fn error(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

struct MockState {
    token_reply: Mutex<TokenReply>,
    token_delay: Mutex<Duration>,
    userinfo_status: AtomicU16,
    register_reply: Mutex<(StatusCode, String)>,
    token_hits: AtomicUsize,
    userinfo_hits: AtomicUsize,
    register_hits: AtomicUsize,
    last_token_form: Mutex<Option<HashMap<String, String>>>,
    last_authorization: Mutex<Option<String>>,
    last_register_body: Mutex<Option<serde_json::Value>>,
}

pub(crate) struct MockAuthServer {
    base: String,
    state: Arc<MockState>,
}

impl MockAuthServer {
    pub(crate) async fn start(token_reply: TokenReply) -> Self {
        let state = Arc::new(MockState {
            token_reply: Mutex::new(token_reply),
            token_delay: Mutex::new(Duration::ZERO),
            userinfo_status: AtomicU16::new(200),
            register_reply: Mutex::new((StatusCode::CREATED, "{}".into())),
            token_hits: AtomicUsize::new(0),
            userinfo_hits: AtomicUsize::new(0),
            register_hits: AtomicUsize::new(0),
            last_token_form: Mutex::new(None),
            last_authorization: Mutex::new(None),
            last_register_body: Mutex::new(None),
        });

        let app = axum::Router::new()
            .route("/oauth2/token", post(token_handler))
            .route("/userinfo", get(userinfo_handler))
            .route("/api/auth/register", post(register_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    pub(crate) fn with_userinfo_status(self, status: StatusCode) -> Self {
        self.state
            .userinfo_status
            .store(status.as_u16(), Ordering::SeqCst);
        self
    }

    pub(crate) fn with_register_reply(self, status: StatusCode, body: &str) -> Self {
        *self.state.register_reply.lock().unwrap() = (status, body.to_owned());
        self
    }

    /// Hold every token response for `delay` before answering.
    pub(crate) fn with_token_delay(self, delay: Duration) -> Self {
        *self.state.token_delay.lock().unwrap() = delay;
        self
    }

    pub(crate) fn set_token_reply(&self, reply: TokenReply) {
        *self.state.token_reply.lock().unwrap() = reply;
    }

    /// Client config pointing at this server with the default client identity.
    pub(crate) fn config(&self) -> ClientConfig {
        ClientConfig {
            auth_server_base: self.base.clone(),
            ..ClientConfig::default()
        }
    }

    pub(crate) fn token_hits(&self) -> usize {
        self.state.token_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn userinfo_hits(&self) -> usize {
        self.state.userinfo_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn register_hits(&self) -> usize {
        self.state.register_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn last_token_form(&self) -> Option<HashMap<String, String>> {
        self.state.last_token_form.lock().unwrap().clone()
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }

    pub(crate) fn last_register_body(&self) -> Option<serde_json::Value> {
        self.state.last_register_body.lock().unwrap().clone()
    }
}

async fn token_handler(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.token_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_token_form.lock().unwrap() = Some(form);
    let delay = *state.token_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let reply = state.token_reply.lock().unwrap().clone();
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

async fn userinfo_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.userinfo_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let status = StatusCode::from_u16(state.userinfo_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = if status.is_success() {
        serde_json::json!({"sub": "alice", "name": "Alice", "email": "alice@example.com"})
    } else {
        serde_json::json!({"error": "insufficient_scope"})
    };
    (status, Json(body))
}

async fn register_handler(
    State(state): State<Arc<MockState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.register_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_register_body.lock().unwrap() = Some(body);
    let (status, body) = state.register_reply.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}
