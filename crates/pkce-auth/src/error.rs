//! Error types for the PKCE client flow

/// Errors from the authorization flow.
///
/// `ExchangeRejected` and `Registration` display the server-provided message
/// verbatim because that text is shown to the user as the session error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("verifier missing")]
    VerifierMissing,

    #[error("{message}")]
    ExchangeRejected { message: String },

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("{message}")]
    AuthorizationDenied { message: String },

    #[error("{message}")]
    Registration { message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
