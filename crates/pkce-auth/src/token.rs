//! Token endpoint and profile endpoint calls
//!
//! Two back-channel requests make up the flow after the redirect returns:
//! 1. Authorization code exchange (`POST /oauth2/token`)
//! 2. Profile lookup with the new bearer token (`GET /userinfo`)
//!
//! Neither follows browser redirects or touches session state; the session
//! decides what a failure means.

use std::fmt;

use common::Secret;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::constants::VERIFIER_PREVIEW_LEN;
use crate::error::{Error, Result};

/// Successful token endpoint response. Only `access_token` is required.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Profile claims from the userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserInfo {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Exchange an authorization code plus its PKCE verifier for an access token.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &ClientConfig,
    code: &str,
    verifier: &Secret<String>,
) -> Result<TokenResponse> {
    let url = config.token_endpoint();
    if config.diagnostics {
        debug!(
            url,
            redirect_uri = config.redirect_uri,
            client_id = config.client_id,
            code_verifier = verifier.preview(VERIFIER_PREVIEW_LEN),
            "token exchange request"
        );
    }

    let response = client
        .post(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
            ("code_verifier", verifier.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::NetworkFailure(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if config.diagnostics {
        debug!(status = status.as_u16(), "token exchange response");
    }

    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "failed to read token endpoint error body");
                String::new()
            }
        };
        if config.diagnostics {
            debug!(body, "token endpoint error body");
        }
        return Err(Error::ExchangeRejected {
            message: rejection_message(status, &body),
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::ExchangeRejected {
            message: format!("invalid token response: {e}"),
        })
}

/// Pick the most specific failure text a token endpoint gave us.
///
/// Order: `error_description`, `error`, then the HTTP status line. A body
/// that is not JSON is appended to the status line when non-empty.
pub fn rejection_message(status: StatusCode, body: &str) -> String {
    let status_line = format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    );

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => ["error_description", "error"]
            .iter()
            .find_map(|field| {
                json.get(field)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
            })
            .map(str::to_owned)
            .unwrap_or(status_line),
        Err(_) if body.trim().is_empty() => status_line,
        Err(_) => format!("{status_line} - {body}"),
    }
}

/// Fetch profile claims for the holder of `token`.
///
/// Every failure maps to `ProfileUnavailable`; callers treat it as
/// non-fatal.
pub async fn fetch_user_info(
    client: &reqwest::Client,
    config: &ClientConfig,
    token: &Secret<String>,
) -> Result<UserInfo> {
    let response = client
        .get(config.userinfo_endpoint())
        .bearer_auth(token.expose())
        .send()
        .await
        .map_err(|e| Error::ProfileUnavailable(format!("userinfo request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::ProfileUnavailable(format!(
            "userinfo endpoint returned {status}"
        )));
    }

    response
        .json::<UserInfo>()
        .await
        .map_err(|e| Error::ProfileUnavailable(format!("invalid userinfo response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockAuthServer, TokenReply};

    fn verifier() -> Secret<String> {
        Secret::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".into())
    }

    #[test]
    fn token_response_requires_only_access_token() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"at_abc"}"#).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert!(token.expires_in.is_none());

        let full: TokenResponse = serde_json::from_str(
            r#"{"access_token":"at","token_type":"Bearer","expires_in":300,"scope":"openid"}"#,
        )
        .unwrap();
        assert_eq!(full.token_type.as_deref(), Some("Bearer"));
        assert_eq!(full.expires_in, Some(300));
    }

    #[test]
    fn token_response_debug_redacts_access_token() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"at_secret_value"}"#).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("at_secret_value"), "leaked: {debug}");
    }

    #[test]
    fn user_info_uses_sub_on_the_wire() {
        let info: UserInfo = serde_json::from_str(r#"{"sub":"alice","email":"a@x.io"}"#).unwrap();
        assert_eq!(info.subject, "alice");
        assert_eq!(info.email.as_deref(), Some("a@x.io"));
        assert!(info.name.is_none());
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({"sub": "alice", "email": "a@x.io"})
        );
    }

    #[test]
    fn rejection_prefers_error_description() {
        let body = r#"{"error":"invalid_grant","error_description":"code expired"}"#;
        assert_eq!(rejection_message(StatusCode::BAD_REQUEST, body), "code expired");
    }

    #[test]
    fn rejection_falls_back_to_error_code() {
        let body = r#"{"error":"invalid_client"}"#;
        assert_eq!(rejection_message(StatusCode::UNAUTHORIZED, body), "invalid_client");
    }

    #[test]
    fn rejection_falls_back_to_status_for_json_without_fields() {
        assert_eq!(
            rejection_message(StatusCode::BAD_REQUEST, r#"{"detail":"nope"}"#),
            "HTTP 400: Bad Request"
        );
    }

    #[test]
    fn rejection_appends_non_json_body() {
        assert_eq!(
            rejection_message(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded"),
            "HTTP 500: Internal Server Error - upstream exploded"
        );
        assert_eq!(
            rejection_message(StatusCode::BAD_GATEWAY, ""),
            "HTTP 502: Bad Gateway"
        );
    }

    #[tokio::test]
    async fn exchange_posts_pkce_form() {
        let server = MockAuthServer::start(TokenReply::ok("at_123")).await;
        let client = reqwest::Client::new();

        let token = exchange_code(&client, &server.config(), "code-abc", &verifier())
            .await
            .unwrap();
        assert_eq!(token.access_token, "at_123");

        let form = server.last_token_form().unwrap();
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(form["code"], "code-abc");
        assert_eq!(form["redirect_uri"], "http://localhost:5173/authorized");
        assert_eq!(form["client_id"], "client");
        assert_eq!(form["code_verifier"], verifier().expose().as_str());
        assert_eq!(server.token_hits(), 1);
    }

    #[tokio::test]
    async fn exchange_surfaces_error_description() {
        let server = MockAuthServer::start(TokenReply::error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"code expired"}"#,
        ))
        .await;

        let err = exchange_code(&reqwest::Client::new(), &server.config(), "c", &verifier())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::ExchangeRejected {
                message: "code expired".into()
            }
        );
    }

    #[tokio::test]
    async fn exchange_without_access_token_is_rejected() {
        let server = MockAuthServer::start(TokenReply::error(
            StatusCode::OK,
            r#"{"token_type":"Bearer"}"#,
        ))
        .await;

        let err = exchange_code(&reqwest::Client::new(), &server.config(), "c", &verifier())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExchangeRejected { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn exchange_truncated_error_body_falls_back_to_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // Promise more body than is sent, then hang up
            socket
                .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 100\r\n\r\n{\"err")
                .await
                .unwrap();
        });

        let config = ClientConfig {
            auth_server_base: format!("http://{addr}"),
            ..ClientConfig::default()
        };
        let err = exchange_code(&reqwest::Client::new(), &config, "c", &verifier())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::ExchangeRejected {
                message: "HTTP 400: Bad Request".into()
            }
        );
    }

    #[tokio::test]
    async fn exchange_unreachable_server_is_network_failure() {
        let config = ClientConfig {
            auth_server_base: "http://127.0.0.1:1".into(),
            ..ClientConfig::default()
        };
        let err = exchange_code(&reqwest::Client::new(), &config, "c", &verifier())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NetworkFailure(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn user_info_sends_bearer_token() {
        let server = MockAuthServer::start(TokenReply::ok("at_123")).await;
        let token = Secret::new(String::from("at_123"));

        let info = fetch_user_info(&reqwest::Client::new(), &server.config(), &token)
            .await
            .unwrap();
        assert_eq!(info.subject, "alice");
        assert_eq!(server.last_authorization().as_deref(), Some("Bearer at_123"));
    }

    #[tokio::test]
    async fn user_info_forbidden_is_profile_unavailable() {
        let server = MockAuthServer::start(TokenReply::ok("at_123"))
            .await
            .with_userinfo_status(StatusCode::FORBIDDEN);
        let token = Secret::new(String::from("at_123"));

        let err = fetch_user_info(&reqwest::Client::new(), &server.config(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProfileUnavailable(_)), "got {err:?}");
    }
}
