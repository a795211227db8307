//! Auth session manager
//!
//! Owns everything a tab knows about the login: the exchange state, the
//! access token and its decoded claims, the profile, and the transient
//! `loading` / `last_error` signals the UI renders. All mutation goes
//! through the operations on [`AuthSession`]; readers get cloned snapshots.
//!
//! The state lock is only held to read or write fields, never across a
//! network call, so the UI can observe `loading` while an exchange runs.
//! Concurrent logins are not prevented here: the UI disables its controls
//! while `loading` is set.

use std::sync::{Arc, Mutex as StdMutex};

use common::Secret;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::claims::{TokenClaims, decode_claims};
use crate::config::ClientConfig;
use crate::constants::{ERROR_DISMISS_AFTER, VERIFIER_PREVIEW_LEN, VERIFIER_STORAGE_KEY};
use crate::error::{Error, Result};
use crate::exchange::{ExchangeAction, ExchangeEvent, ExchangeState, handle_event};
use crate::host::{Navigator, VerifierStorage};
use crate::pkce;
use crate::token::{self, UserInfo};

#[derive(Default)]
struct SessionState {
    exchange: ExchangeState,
    access_token: Option<Secret<String>>,
    claims: Option<TokenClaims>,
    profile: Option<UserInfo>,
    loading: bool,
    last_error: Option<String>,
}

impl SessionState {
    /// Claims always follow the token.
    fn set_token(&mut self, token: Option<Secret<String>>) {
        self.claims = token.as_ref().and_then(|t| decode_claims(t.expose()));
        self.access_token = token;
    }

    fn transition(&mut self, event: ExchangeEvent) -> ExchangeAction {
        let (next, action) = handle_event(std::mem::take(&mut self.exchange), event);
        self.exchange = next;
        action
    }
}

/// Point-in-time copy of the session for rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: ExchangeState,
    pub access_token: Option<Secret<String>>,
    pub claims: Option<TokenClaims>,
    pub profile: Option<UserInfo>,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

pub struct AuthSession {
    config: ClientConfig,
    client: reqwest::Client,
    storage: Arc<dyn VerifierStorage>,
    navigator: Arc<dyn Navigator>,
    state: Arc<Mutex<SessionState>>,
    /// Pending auto-dismissal of `last_error`
    dismissal: StdMutex<Option<JoinHandle<()>>>,
}

impl AuthSession {
    /// Fresh session, as on page load.
    pub fn new(
        config: ClientConfig,
        client: reqwest::Client,
        storage: Arc<dyn VerifierStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            client,
            storage,
            navigator,
            state: Arc::new(Mutex::new(SessionState::default())),
            dismissal: StdMutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start the flow: new verifier/challenge pair, then hand the browser to
    /// the authorization server.
    pub async fn begin_login(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.loading = true;
            self.clear_error(&mut state);
        }

        let verifier = Secret::new(pkce::generate_verifier());
        let challenge = pkce::compute_challenge(verifier.expose());
        self.storage
            .set(VERIFIER_STORAGE_KEY, verifier.expose().clone());
        if self.config.diagnostics {
            debug!(
                code_verifier = verifier.preview(VERIFIER_PREVIEW_LEN),
                "stored code verifier"
            );
        }

        let handoff = pkce::build_authorization_url(&self.config, &challenge)
            .and_then(|url| self.navigator.navigate(&url));

        let mut state = self.state.lock().await;
        state.loading = false;
        match handoff {
            Ok(()) => {
                info!(client_id = self.config.client_id, "redirecting to authorization server");
                Ok(())
            }
            Err(e) => {
                self.storage.remove(VERIFIER_STORAGE_KEY);
                warn!(error = %e, "failed to initiate login");
                self.report_error(&mut state, format!("Failed to initiate login: {e}"));
                Err(e)
            }
        }
    }

    /// Inspect the URL the page was loaded with and finish the flow if the
    /// authorization server sent us back.
    ///
    /// Returns `true` when a code was exchanged for a token. Does nothing
    /// while a token is held, so re-running it is harmless. An empty `code`
    /// counts as no code.
    pub async fn handle_redirect(&self) -> Result<bool> {
        let url = self.navigator.current_url();
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if self.state.lock().await.access_token.is_some() {
            return Ok(false);
        }

        if let Some(code) = param("code").filter(|c| !c.is_empty()) {
            return self.exchange_code(&code).await;
        }

        if let Some(error) = param("error") {
            let message = param("error_description")
                .filter(|d| !d.is_empty())
                .unwrap_or(error);
            warn!(error = %message, "authorization server returned an error");

            self.storage.remove(VERIFIER_STORAGE_KEY);
            self.navigator.replace_url(&without_query(url.clone()));
            let mut state = self.state.lock().await;
            self.report_error(&mut state, message.clone());
            return Err(Error::AuthorizationDenied { message });
        }

        Ok(false)
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The stored verifier is consumed whatever the outcome; a failed code
    /// cannot be retried and the flow restarts from [`begin_login`].
    ///
    /// Returns `true` when the session now holds the issued token; `false`
    /// when the code was ignored (an exchange already ran) or the session was
    /// logged out while the request was in flight.
    ///
    /// [`begin_login`]: AuthSession::begin_login
    pub async fn exchange_code(&self, code: &str) -> Result<bool> {
        let action = {
            let mut state = self.state.lock().await;
            let action = state.transition(ExchangeEvent::CodeReceived {
                code: code.to_owned(),
            });
            if matches!(action, ExchangeAction::RequestToken { .. }) {
                state.loading = true;
                self.clear_error(&mut state);
            }
            action
        };

        let ExchangeAction::RequestToken { code } = action else {
            debug!("authorization code ignored, exchange already handled");
            return Ok(false);
        };

        let outcome = match self.storage.get(VERIFIER_STORAGE_KEY) {
            Some(verifier) => {
                let verifier = Secret::new(verifier);
                token::exchange_code(&self.client, &self.config, &code, &verifier).await
            }
            None => Err(Error::VerifierMissing),
        };
        self.storage.remove(VERIFIER_STORAGE_KEY);

        match outcome {
            Ok(response) => {
                let token = Secret::new(response.access_token);
                {
                    let mut state = self.state.lock().await;
                    // Only an exchange still in flight may store the token
                    let action = state.transition(ExchangeEvent::TokenIssued);
                    if action != ExchangeAction::FetchProfile {
                        debug!("token discarded, session ended during exchange");
                        return Ok(false);
                    }
                    state.set_token(Some(token.clone()));
                    if self.config.diagnostics {
                        debug!(claims = ?state.claims, "decoded token claims");
                    }
                }

                self.navigator
                    .replace_url(&without_query(self.navigator.current_url()));
                info!("token exchange succeeded");

                self.fetch_profile(&token).await;

                self.state.lock().await.loading = false;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "token exchange failed");
                let mut state = self.state.lock().await;
                state.loading = false;
                let action = state.transition(ExchangeEvent::ExchangeFailed {
                    error: e.to_string(),
                });
                match action {
                    ExchangeAction::ReportError { error } => {
                        self.report_error(&mut state, error);
                        Err(e)
                    }
                    _ => {
                        debug!(error = %e, "exchange failure ignored, session ended");
                        Ok(false)
                    }
                }
            }
        }
    }

    /// Best-effort profile lookup. Failures are logged and never become the
    /// session error.
    pub async fn fetch_profile(&self, token: &Secret<String>) {
        match token::fetch_user_info(&self.client, &self.config, token).await {
            Ok(profile) => {
                let mut state = self.state.lock().await;
                // A logout during the request must not resurrect the profile
                if state.access_token.as_ref() == Some(token) {
                    debug!(subject = profile.subject, "profile loaded");
                    state.profile = Some(profile);
                }
            }
            Err(e) => warn!(error = %e, "continuing without user profile"),
        }
    }

    /// End the session: drop token, claims, profile and any verifier, then
    /// send the UI back to the login view.
    pub async fn logout(&self) {
        {
            let mut state = self.state.lock().await;
            state.transition(ExchangeEvent::LoggedOut);
            state.set_token(None);
            state.profile = None;
            state.loading = false;
            self.clear_error(&mut state);
        }
        self.storage.remove(VERIFIER_STORAGE_KEY);
        info!("session cleared");

        if let Err(e) = self
            .config
            .login_url()
            .and_then(|url| self.navigator.navigate(&url))
        {
            warn!(error = %e, "could not return to login view");
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            status: state.exchange.clone(),
            access_token: state.access_token.clone(),
            claims: state.claims.clone(),
            profile: state.profile.clone(),
            loading: state.loading,
            last_error: state.last_error.clone(),
        }
    }

    pub async fn access_token(&self) -> Option<Secret<String>> {
        self.state.lock().await.access_token.clone()
    }

    pub async fn claims(&self) -> Option<TokenClaims> {
        self.state.lock().await.claims.clone()
    }

    pub async fn profile(&self) -> Option<UserInfo> {
        self.state.lock().await.profile.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn status(&self) -> ExchangeState {
        self.state.lock().await.exchange.clone()
    }

    /// Publish `message` as the session error and schedule its dismissal.
    fn report_error(&self, state: &mut SessionState, message: String) {
        state.last_error = Some(message);

        let shared = Arc::clone(&self.state);
        let dismissal = tokio::spawn(async move {
            tokio::time::sleep(ERROR_DISMISS_AFTER).await;
            shared.lock().await.last_error = None;
        });

        let previous = self
            .dismissal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(dismissal);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn clear_error(&self, state: &mut SessionState) {
        state.last_error = None;
        self.cancel_dismissal();
    }

    fn cancel_dismissal(&self) {
        let pending = self
            .dismissal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(pending) = pending {
            pending.abort();
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.cancel_dismissal();
    }
}

/// The visible URL with the authorization response removed.
fn without_query(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    url
}
