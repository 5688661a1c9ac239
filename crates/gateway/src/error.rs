use {
    axum::{
        Json,
        http::{StatusCode, header::CACHE_CONTROL},
        response::{IntoResponse, Response},
    },
    serde_json::json,
    tracing::warn,
};

use {tempo_oauth::AuthError, tempo_upstream::UpstreamError};

/// Responses on the API surface never cache: everything is per-user.
pub const NO_STORE: &str = "private, no-store, max-age=0";

/// Boundary error: everything a protected route can fail with, mapped to a
/// user-facing status. Upstream status codes and bodies stay in the server
/// log; clients get a generic message.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("{0}")]
    BadRequest(String),
}

impl GatewayError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            GatewayError::Auth(e) => match e {
                AuthError::NotAuthenticated => {
                    (StatusCode::UNAUTHORIZED, "not authenticated".into())
                },
                AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "session expired".into()),
                AuthError::TokenExchange { .. } | AuthError::TokenRefresh { .. } => {
                    (StatusCode::UNAUTHORIZED, "authentication failed".into())
                },
                AuthError::CsrfValidation => (StatusCode::UNAUTHORIZED, "login failed".into()),
                AuthError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, (*msg).into()),
                AuthError::Configuration(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server configuration error".into(),
                ),
                AuthError::Network(_) => (
                    StatusCode::BAD_GATEWAY,
                    "authorization server unreachable".into(),
                ),
            },
            GatewayError::Upstream(e) => match e {
                // A 401 that survived the single refresh retry means the
                // session is done.
                UpstreamError::Unauthorized | UpstreamError::MissingToken => {
                    (StatusCode::UNAUTHORIZED, "session expired".into())
                },
                UpstreamError::RateLimited { .. } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate limited by upstream, try again shortly".into(),
                ),
                UpstreamError::Status { status } => (
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                    "upstream request failed".into(),
                ),
                UpstreamError::Path(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server configuration error".into(),
                ),
                UpstreamError::Network(_) => {
                    (StatusCode::BAD_GATEWAY, "upstream unreachable".into())
                },
            },
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (
            status,
            [(CACHE_CONTROL, NO_STORE)],
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
