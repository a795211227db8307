//! OAuth client constants
//!
//! Defaults for the demo's public client registration and the fixed paths
//! the authorization server exposes. None of these are secrets.

use std::time::Duration;

/// Default authorization server base address
pub const DEFAULT_AUTH_SERVER: &str = "http://localhost:9000";

/// Default public client identifier
pub const DEFAULT_CLIENT_ID: &str = "client";

/// Default redirect target registered for the client
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/authorized";

/// Default requested scope set
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile", "read", "write"];

/// Authorization endpoint path (browser redirect)
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize";

/// Token endpoint path (code exchange)
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Profile endpoint path (bearer-authenticated)
pub const USERINFO_PATH: &str = "/userinfo";

/// Account registration endpoint path
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Route the host shows when the session ends
pub const LOGIN_ROUTE: &str = "/login";

/// Tab-scoped storage key for the PKCE code verifier
pub const VERIFIER_STORAGE_KEY: &str = "code_verifier";

/// How long a session-level error stays visible before it is dismissed
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Characters of the verifier shown in diagnostic logs
pub const VERIFIER_PREVIEW_LEN: usize = 10;
