//! Login initiation, callback, and logout. Thin by contract: all the PKCE
//! and token logic lives in `tempo-oauth`; these handlers move values
//! between the query string, the cookie store, and redirects.

use std::time::Duration;

use {
    axum::{
        Json,
        extract::{Query, State},
        response::{IntoResponse, Redirect, Response},
    },
    axum_extra::extract::cookie::PrivateCookieJar,
    serde::Deserialize,
    serde_json::json,
    tracing::{info, warn},
    url::Url,
};

use tempo_oauth::{
    AuthError, SecretKey, SecretStore, SessionManager, generate_pkce, generate_state,
};

use crate::{cookies::CookieSecretStore, error::GatewayError, state::AppState};

/// How long a login attempt's verifier and state stay valid.
const LOGIN_TTL: Duration = Duration::from_secs(600);

/// `GET /auth/login` — mint a PKCE pair and state, stash both, redirect to
/// the authorization server.
pub async fn login(State(app): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut store = CookieSecretStore::new(jar, app.config.cookies.secure);
    match start_login(&app, &mut store) {
        Ok(url) => {
            info!("redirecting to authorization server");
            (store.into_jar(), Redirect::to(url.as_str())).into_response()
        },
        Err(e) => GatewayError::from(e).into_response(),
    }
}

fn start_login(app: &AppState, store: &mut CookieSecretStore) -> Result<Url, AuthError> {
    let pair = generate_pkce();
    let state = generate_state();

    // Validate config before touching the store so a misconfigured server
    // leaves no stray attempt cookies.
    let url = app.tokens.authorize_url(&pair.challenge, &state)?;

    store.put(SecretKey::PkceVerifier, &pair.verifier, LOGIN_TTL);
    store.put(SecretKey::OauthState, &state, LOGIN_TTL);
    Ok(url)
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `GET /auth/callback` — validate state + verifier, exchange the code,
/// persist the session. Every outcome redirects the browser; failures carry
/// no detail beyond `error=login_failed`.
pub async fn callback(
    State(app): State<AppState>,
    jar: PrivateCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let mut store = CookieSecretStore::new(jar, app.config.cookies.secure);
    let result = complete_login(&app, &mut store, query).await;

    let base = &app.config.server.public_base_url;
    let target = match result {
        Ok(()) => {
            info!("login completed");
            format!("{base}/dashboard/overview")
        },
        Err(e) => {
            warn!(error = %e, "login callback failed");
            format!("{base}/?error=login_failed")
        },
    };
    (store.into_jar(), Redirect::to(&target)).into_response()
}

async fn complete_login(
    app: &AppState,
    store: &mut CookieSecretStore,
    query: CallbackQuery,
) -> Result<(), AuthError> {
    let stored_state = store.get(SecretKey::OauthState);
    let verifier = store.get(SecretKey::PkceVerifier);

    // Both entries are single-use: gone after this callback no matter how
    // validation turns out.
    store.delete(SecretKey::OauthState);
    store.delete(SecretKey::PkceVerifier);

    if let Some(err) = query.error {
        warn!(error = %err, "authorization server reported an error");
        return Err(AuthError::InvalidRequest("authorization denied"));
    }

    let (Some(code), Some(state)) = (query.code, query.state) else {
        return Err(AuthError::CsrfValidation);
    };
    let (Some(stored_state), Some(verifier)) = (stored_state, verifier) else {
        return Err(AuthError::CsrfValidation);
    };
    if state != stored_state {
        return Err(AuthError::CsrfValidation);
    }

    let tokens = app.tokens.exchange_code(&code, &verifier).await?;
    let mut sessions = SessionManager::new(&mut *store, app.tokens.clone());
    sessions.establish(&tokens)
}

/// `POST /auth/logout` — drop the session record. Succeeds whether or not a
/// session existed.
pub async fn logout(State(app): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut store = CookieSecretStore::new(jar, app.config.cookies.secure);
    let mut sessions = SessionManager::new(&mut store, app.tokens.clone());
    sessions.logout();
    (
        store.into_jar(),
        Json(json!({ "message": "session cleared" })),
    )
        .into_response()
}
