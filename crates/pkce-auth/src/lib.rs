//! OAuth 2.0 Authorization Code + PKCE client
//!
//! Client-side half of the flow for a public client: the authorization
//! server does all validation, this crate only drives it. Nothing is
//! persisted; the token lives in session memory until logout.
//!
//! Flow:
//! 1. `AuthSession::begin_login()` stores a fresh verifier and navigates to
//!    `pkce::build_authorization_url()`
//! 2. The server redirects back with `?code=`
//! 3. `AuthSession::handle_redirect()` exchanges code + verifier via
//!    `token::exchange_code()` (state machine in `exchange`)
//! 4. The token's payload is decoded by `claims::decode_claims()` for display
//! 5. `AuthSession::fetch_profile()` loads `/userinfo`, best-effort
//! 6. `AuthSession::logout()` drops everything
//!
//! The browser is abstracted behind `host::VerifierStorage` and
//! `host::Navigator`.

pub mod claims;
pub mod config;
pub mod constants;
pub mod error;
pub mod exchange;
pub mod host;
pub mod pkce;
pub mod register;
pub mod session;
pub mod token;

#[cfg(test)]
mod test_support;

pub use claims::{ScopeClaim, TokenClaims, decode_claims, normalize_scopes};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use exchange::ExchangeState;
pub use host::{MemoryNavigator, MemoryStorage, Navigator, VerifierStorage};
pub use pkce::{build_authorization_url, compute_challenge, generate_verifier};
pub use register::{Registration, register};
pub use session::{AuthSession, SessionSnapshot};
pub use token::{TokenResponse, UserInfo};
