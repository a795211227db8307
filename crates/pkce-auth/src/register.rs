//! Account registration against the authorization server
//!
//! Not part of the OAuth flow: a plain JSON POST so the demo can create a
//! user before logging in. Input validation belongs to the form that calls
//! this.

use common::Secret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Message shown when the registration request never reached the server
pub const REGISTRATION_NETWORK_ERROR: &str =
    "Network error. Please check your connection and try again.";

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Deserialize)]
struct RegistrationError {
    message: Option<String>,
}

/// Create an account. Any 2xx counts as success.
pub async fn register(
    client: &reqwest::Client,
    config: &ClientConfig,
    registration: &Registration,
) -> Result<()> {
    let response = client
        .post(config.register_endpoint())
        .json(&serde_json::json!({
            "username": registration.username,
            "email": registration.email,
            "password": registration.password.expose(),
        }))
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "registration request failed");
            Error::NetworkFailure(REGISTRATION_NETWORK_ERROR.into())
        })?;

    let status = response.status();
    if status.is_success() {
        info!(username = %registration.username, "account registered");
        return Ok(());
    }

    let message = response
        .json::<RegistrationError>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Registration failed ({})", status.as_u16()));

    warn!(status = status.as_u16(), error = %message, "registration rejected");
    Err(Error::Registration { message })
}
