//! HTTP surface of the demo host
//!
//! The host plays the browser tab for a single user: one `AuthSession`, one
//! `MemoryNavigator` whose recorded navigations become 303 redirects.
//!
//! Routes:
//! - GET  /            session view (JSON)
//! - GET  /login       unauthenticated view
//! - POST /login       start the PKCE flow, 303 to the authorization server
//! - GET  /authorized  redirect target; exchanges `?code=` and shows the session
//! - POST /logout      clear the session, 303 to /login
//! - POST /register    create an account on the authorization server
//! - GET  /health      liveness

use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use common::Secret;
use pkce_auth::{
    AuthSession, ExchangeState, MemoryNavigator, Navigator, Registration, SessionSnapshot,
};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<AuthSession>,
    pub navigator: Arc<MemoryNavigator>,
    pub client: reqwest::Client,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/login", get(login_page).post(login))
        .route("/authorized", get(authorized))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    Json(session_view(&state.session.snapshot().await))
}

async fn login_page(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.session.snapshot().await;
    Json(serde_json::json!({
        "authenticated": snapshot.is_authenticated(),
        "loading": snapshot.loading,
        "last_error": snapshot.last_error,
        "sign_in": "POST /login",
        "register": "POST /register",
    }))
}

async fn login(State(state): State<AppState>) -> Response {
    if let Err(e) = state.session.begin_login().await {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
    }
    match state.navigator.take_navigation() {
        Some(target) => Redirect::to(target.as_str()).into_response(),
        None => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "login did not produce an authorization URL",
        ),
    }
}

async fn authorized(State(state): State<AppState>, uri: Uri) -> Response {
    let has_response = uri.query().is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .any(|(k, v)| (k == "code" && !v.is_empty()) || k == "error")
    });

    if has_response {
        match page_url(&state, &uri) {
            Ok(url) => state.navigator.load(url),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        }
        match state.session.handle_redirect().await {
            // Token issued and the code stripped from the session URL; make the
            // browser follow
            Ok(true) => return Redirect::to(state.navigator.current_url().path()).into_response(),
            Ok(false) => {}
            Err(e) => info!(error = %e, "authorization response not exchanged"),
        }
    }

    let snapshot = state.session.snapshot().await;
    if !snapshot.is_authenticated() && !has_response {
        return Redirect::to("/login").into_response();
    }
    Json(session_view(&snapshot)).into_response()
}

async fn logout(State(state): State<AppState>) -> Response {
    state.session.logout().await;
    let target = state
        .navigator
        .take_navigation()
        .map(|url| url.path().to_owned())
        .unwrap_or_else(|| "/login".into());
    Redirect::to(&target).into_response()
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    let registration = Registration {
        username: body.username,
        email: body.email,
        password: Secret::new(body.password),
    };

    match pkce_auth::register(&state.client, state.session.config(), &registration).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "status": "registered", "next": "/login" })),
        )
            .into_response(),
        Err(e @ pkce_auth::Error::NetworkFailure(_)) => {
            error_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// Rebuild the absolute URL the "browser" is on from the request.
fn page_url(state: &AppState, uri: &Uri) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&state.session.config().redirect_uri)?;
    url.set_path(uri.path());
    url.set_query(uri.query());
    Ok(url)
}

fn status_label(status: &ExchangeState) -> &'static str {
    match status {
        ExchangeState::Idle => "idle",
        ExchangeState::Exchanging => "exchanging",
        ExchangeState::Authenticated => "authenticated",
        ExchangeState::Failed { .. } => "failed",
    }
}

fn session_view(snapshot: &SessionSnapshot) -> serde_json::Value {
    serde_json::json!({
        "authenticated": snapshot.is_authenticated(),
        "status": status_label(&snapshot.status),
        "loading": snapshot.loading,
        "last_error": snapshot.last_error,
        "access_token": snapshot.access_token.as_ref().map(|t| t.expose().clone()),
        "claims": snapshot.claims.as_ref().map(|claims| serde_json::json!({
            "scopes": claims.scopes(),
            "issued_at": claims.issued_at,
            "expires_at": claims.expires_at,
            "client_id": claims.client_id,
        })),
        "profile": snapshot.profile,
    })
}

fn error_response(status: StatusCode, message: &str) -> Response {
    if status.is_server_error() {
        warn!(status = status.as_u16(), error = message, "request failed");
    }
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
