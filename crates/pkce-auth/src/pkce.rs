//! PKCE (Proof Key for Code Exchange) per RFC 7636
//!
//! The verifier stays with the client (tab-scoped storage) until the code
//! exchange; only its S256 challenge travels in the authorization redirect.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::ClientConfig;
use crate::error::Result;

/// Challenge method sent with every authorization request
pub const CHALLENGE_METHOD: &str = "S256";

/// Generate a cryptographically random PKCE code verifier.
///
/// 32 random bytes encoded as URL-safe base64 without padding, which gives
/// 43 characters: the minimum length RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the authorization URL the browser is sent to.
///
/// Query values are form-urlencoded, so the space-separated scope list
/// arrives as `openid+profile+...`.
pub fn build_authorization_url(config: &ClientConfig, challenge: &str) -> Result<Url> {
    let url = Url::parse_with_params(
        &config.authorize_endpoint(),
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", config.scope_param().as_str()),
            ("code_challenge", challenge),
            ("code_challenge_method", CHALLENGE_METHOD),
        ],
    )?;
    Ok(url)
}
