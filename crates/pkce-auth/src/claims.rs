//! Access token claims for display
//!
//! The token is treated as opaque for authorization purposes; decoding its
//! payload only feeds the session view. Signatures are not verified and any
//! malformed input simply yields no claims.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// The `scope` claim as servers actually send it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    /// Space-delimited string (RFC 8693 style)
    String(String),
    /// JSON array of scope names
    List(Vec<String>),
    #[default]
    Absent,
}

impl From<serde_json::Value> for ScopeClaim {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => ScopeClaim::String(s),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map_or(ScopeClaim::Absent, ScopeClaim::List),
            _ => ScopeClaim::Absent,
        }
    }
}

fn deserialize_scope<'de, D>(deserializer: D) -> std::result::Result<ScopeClaim, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(ScopeClaim::from)
}

/// Normalize a scope claim into an ordered list of scope names.
///
/// Strings split on whitespace with empty pieces dropped; anything that is
/// not a string or a list of strings normalizes to an empty list.
pub fn normalize_scopes(scope: &ScopeClaim) -> Vec<String> {
    match scope {
        ScopeClaim::String(s) => s.split_whitespace().map(str::to_owned).collect(),
        ScopeClaim::List(items) => items.clone(),
        ScopeClaim::Absent => Vec::new(),
    }
}

/// Claims decoded from the access token payload.
///
/// Times are unix seconds as issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenClaims {
    pub scope: ScopeClaim,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    /// `client_id` claim, or `azp` when the server only sets the latter
    pub client_id: Option<String>,
}

impl TokenClaims {
    pub fn scopes(&self) -> Vec<String> {
        normalize_scopes(&self.scope)
    }
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default, deserialize_with = "deserialize_scope")]
    scope: ScopeClaim,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    azp: Option<String>,
}

/// Decode the payload segment of a JWT-shaped token.
pub fn try_decode_claims(token: &str) -> Result<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::MalformedToken("token has no payload segment".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::MalformedToken(format!("payload is not base64url: {e}")))?;

    let raw: RawClaims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedToken(format!("payload is not a JSON object: {e}")))?;

    Ok(TokenClaims {
        scope: raw.scope,
        issued_at: raw.iat,
        expires_at: raw.exp,
        client_id: raw.client_id.or(raw.azp),
    })
}

/// Best-effort variant of [`try_decode_claims`] used for display.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    match try_decode_claims(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "token claims unavailable");
            None
        }
    }
}
