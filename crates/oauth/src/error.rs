use thiserror::Error;

/// Failures across the PKCE flow and session lifecycle.
///
/// Upstream status and body are kept for server-side diagnostics only; the
/// HTTP boundary maps every variant to a user-facing state without leaking
/// detail.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or unusable client configuration. Fatal for the request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// State mismatch or missing verifier/state on callback.
    #[error("state or verifier validation failed")]
    CsrfValidation,

    /// A caller passed an obviously malformed value (empty code or token).
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// The token endpoint rejected the authorization-code exchange.
    #[error("token exchange failed with status {status}")]
    TokenExchange { status: u16, body: String },

    /// The token endpoint rejected the refresh-token exchange.
    #[error("token refresh failed with status {status}")]
    TokenRefresh { status: u16, body: String },

    /// No session record present; the user has to log in.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Session present but unrecoverable (no refresh token, or refresh was
    /// rejected). The stale record has been cleared.
    #[error("session expired")]
    SessionExpired,

    /// Transport-level failure talking to the token endpoint, timeouts
    /// included.
    #[error("token endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),
}
