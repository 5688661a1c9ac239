//! Protected proxy routes over the provider API. Each resolves an access
//! token through the session manager, forwards one GET, and relays the JSON
//! body. Query validation is owned here, not by the core.

use {
    axum::{
        Json,
        extract::{Query, State},
        http::header::CACHE_CONTROL,
        response::{IntoResponse, Response},
    },
    axum_extra::extract::cookie::PrivateCookieJar,
    serde::Deserialize,
    serde_json::Value,
    tracing::debug,
};

use {
    tempo_oauth::{SecretStore, SessionManager},
    tempo_upstream::{ResourceClient, UpstreamError},
};

use crate::{
    cookies::CookieSecretStore,
    error::{GatewayError, NO_STORE},
    state::AppState,
};

/// `GET /api/me` — the authorized user's profile.
pub async fn me(State(app): State<AppState>, jar: PrivateCookieJar) -> Response {
    proxy(app, jar, "me".to_string()).await
}

/// `GET /api/me/player/currently-playing` — what is playing right now;
/// JSON null when nothing is.
pub async fn currently_playing(State(app): State<AppState>, jar: PrivateCookieJar) -> Response {
    proxy(app, jar, "me/player/currently-playing".to_string()).await
}

const TOP_TYPES: &[&str] = &["artists", "tracks"];
const TIME_RANGES: &[&str] = &["long_term", "medium_term", "short_term"];

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub time_range: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// `GET /api/me/top` — the user's top artists or tracks over a time window.
pub async fn top(
    State(app): State<AppState>,
    jar: PrivateCookieJar,
    Query(query): Query<TopQuery>,
) -> Response {
    let path = match top_resource_path(query) {
        Ok(path) => path,
        Err(e) => return GatewayError::BadRequest(e).into_response(),
    };
    proxy(app, jar, path).await
}

/// Validate pagination/time-window parameters and build the upstream path.
fn top_resource_path(query: TopQuery) -> Result<String, String> {
    let kind = query.kind.as_deref().unwrap_or("tracks");
    if !TOP_TYPES.contains(&kind) {
        return Err(r#"invalid "type": allowed values are "artists", "tracks""#.into());
    }

    let time_range = query.time_range.as_deref().unwrap_or("medium_term");
    if !TIME_RANGES.contains(&time_range) {
        return Err(
            r#"invalid "time_range": allowed values are "long_term", "medium_term", "short_term""#
                .into(),
        );
    }

    let limit: i64 = match query.limit.as_deref() {
        None => 20,
        Some(raw) => raw
            .parse()
            .map_err(|_| r#"invalid "limit": must be an integer between 1 and 50"#.to_string())?,
    };
    if !(1..=50).contains(&limit) {
        return Err(r#"invalid "limit": must be an integer between 1 and 50"#.into());
    }

    let offset: i64 = match query.offset.as_deref() {
        None => 0,
        Some(raw) => raw
            .parse()
            .map_err(|_| r#"invalid "offset": must be an integer >= 0"#.to_string())?,
    };
    if offset < 0 {
        return Err(r#"invalid "offset": must be an integer >= 0"#.into());
    }

    Ok(format!(
        "me/top/{kind}?time_range={time_range}&limit={limit}&offset={offset}"
    ))
}

/// Run one proxied call through the session choke point and return the jar
/// (possibly holding a rewritten session) with whatever happened.
async fn proxy(app: AppState, jar: PrivateCookieJar, path: String) -> Response {
    let mut store = CookieSecretStore::new(jar, app.config.cookies.secure);
    let result = {
        let mut sessions = SessionManager::new(&mut store, app.tokens.clone());
        fetch_with_refresh(&app.upstream, &mut sessions, &path).await
    };

    let jar = store.into_jar();
    match result {
        Ok(body) => (jar, [(CACHE_CONTROL, NO_STORE)], Json(body)).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

/// Fetch `path` with a valid token. On a 401 the token looked valid locally
/// but was invalidated upstream early: force exactly one refresh and retry
/// once. 429 and every other failure pass straight through.
pub(crate) async fn fetch_with_refresh<S: SecretStore>(
    upstream: &ResourceClient,
    sessions: &mut SessionManager<S>,
    path: &str,
) -> Result<Value, GatewayError> {
    let token = sessions.access_token().await?;
    match upstream.get_json(path, &token).await {
        Err(UpstreamError::Unauthorized) => {
            debug!(path, "upstream rejected token, forcing refresh");
            let token = sessions.force_refresh().await?;
            Ok(upstream.get_json(path, &token).await?)
        },
        other => Ok(other?),
    }
}
