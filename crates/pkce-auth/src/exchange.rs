//! Code exchange state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! `AuthSession` performs the I/O implied by each action and feeds the
//! outcome back in as the next event.
//!
//! ```text
//! Idle ──CodeReceived──▶ Exchanging ──TokenIssued──▶ Authenticated
//!   ▲                        │
//!   │                        └──ExchangeFailed──▶ Failed
//!   └────────────── LoggedOut (from any state) ─────────┘
//! ```

/// Exchange lifecycle states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExchangeState {
    /// No exchange attempted since load or logout
    #[default]
    Idle,
    /// Back-channel token request in flight
    Exchanging,
    /// Token held
    Authenticated,
    /// Last exchange failed; restart from the redirector
    Failed { error: String },
}

/// Events that drive state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// Redirect returned with an authorization code
    CodeReceived { code: String },
    /// Token endpoint issued an access token
    TokenIssued,
    /// Verifier missing, request failed, or server rejected the code
    ExchangeFailed { error: String },
    /// Session cleared by the user
    LoggedOut,
}

/// Actions the session should execute after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeAction {
    /// Load the verifier and POST to the token endpoint
    RequestToken { code: String },
    /// Best-effort profile lookup with the new token
    FetchProfile,
    /// Publish the error as the session error
    ReportError { error: String },
    /// No-op
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: ExchangeState, event: ExchangeEvent) -> (ExchangeState, ExchangeAction) {
    match (state, event) {
        // --- Any state: logout resets ---
        (_, ExchangeEvent::LoggedOut) => (ExchangeState::Idle, ExchangeAction::None),

        // --- Idle / Failed: a fresh code starts an exchange ---
        (ExchangeState::Idle | ExchangeState::Failed { .. }, ExchangeEvent::CodeReceived { code }) => {
            (ExchangeState::Exchanging, ExchangeAction::RequestToken { code })
        }

        // --- Exchanging ---
        (ExchangeState::Exchanging, ExchangeEvent::TokenIssued) => {
            (ExchangeState::Authenticated, ExchangeAction::FetchProfile)
        }

        (ExchangeState::Exchanging, ExchangeEvent::ExchangeFailed { error }) => (
            ExchangeState::Failed {
                error: error.clone(),
            },
            ExchangeAction::ReportError { error },
        ),

        // Duplicate codes while exchanging or authenticated, stray results:
        // stay put
        (state, _event) => (state, ExchangeAction::None),
    }
}
