//! Client configuration
//!
//! The four values that identify this client to the authorization server.
//! They are fixed for the lifetime of a session; the demo host loads them
//! from its TOML file and everything else falls back to the defaults in
//! `constants`.

use serde::Deserialize;
use url::Url;

use crate::constants::{
    AUTHORIZE_PATH, DEFAULT_AUTH_SERVER, DEFAULT_CLIENT_ID, DEFAULT_REDIRECT_URI, DEFAULT_SCOPES,
    LOGIN_ROUTE, REGISTER_PATH, TOKEN_PATH, USERINFO_PATH,
};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_auth_server")]
    pub auth_server_base: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Log verifier previews and exchange diagnostics at debug level
    #[serde(default)]
    pub diagnostics: bool,
}

fn default_auth_server() -> String {
    DEFAULT_AUTH_SERVER.into()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.into()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.into()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_server_base: default_auth_server(),
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            diagnostics: false,
        }
    }
}

impl ClientConfig {
    /// Scope parameter value: the configured scopes joined by spaces.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn authorize_endpoint(&self) -> String {
        self.endpoint(AUTHORIZE_PATH)
    }

    pub fn token_endpoint(&self) -> String {
        self.endpoint(TOKEN_PATH)
    }

    pub fn userinfo_endpoint(&self) -> String {
        self.endpoint(USERINFO_PATH)
    }

    pub fn register_endpoint(&self) -> String {
        self.endpoint(REGISTER_PATH)
    }

    /// The unauthenticated view on the same origin as the redirect target.
    pub fn login_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.redirect_uri)?.join(LOGIN_ROUTE)?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.auth_server_base.trim_end_matches('/'), path)
    }
}
