//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Every field has a default, but the file itself must exist so a typo in
//! the path fails loudly instead of silently talking to localhost.

use pkce_auth::ClientConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// HTTP host settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Timeout for back-channel requests to the authorization server
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5173))
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `PKCE_CLIENT_ID` replaces `client.client_id` when set.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(client_id) = std::env::var("PKCE_CLIENT_ID") {
            let client_id = client_id.trim().to_owned();
            if !client_id.is_empty() {
                config.client.client_id = client_id;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        require_http_url("auth_server_base", &self.client.auth_server_base)?;
        require_http_url("redirect_uri", &self.client.redirect_uri)?;

        if self.client.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if self.client.scopes.is_empty() {
            return Err(common::Error::Config(
                "scopes must contain at least one scope".into(),
            ));
        }
        if self.client.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(common::Error::Config("scopes must not contain blank entries".into()));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(common::Error::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("pkce-demo.toml")
    }
}

fn require_http_url(field: &str, value: &str) -> common::Result<()> {
    let url = Url::parse(value)?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(common::Error::Config(format!(
            "{field} must use http:// or https://, got {other}://"
        ))),
    }
}
