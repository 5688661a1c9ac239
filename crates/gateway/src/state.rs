use std::sync::Arc;

use {
    axum::extract::FromRef,
    axum_extra::extract::cookie::Key,
    base64::{Engine, engine::general_purpose::STANDARD},
    secrecy::ExposeSecret,
    tracing::warn,
};

use {
    tempo_config::{CookieConfig, TempoConfig},
    tempo_oauth::{OAuthConfig, TokenClient},
    tempo_upstream::ResourceClient,
};

/// Shared per-process state. Everything request-scoped (the cookie jar, the
/// session manager) is built inside handlers; this only holds immutable
/// clients and the cookie encryption key.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TempoConfig>,
    pub tokens: TokenClient,
    pub upstream: ResourceClient,
    pub version: &'static str,
    key: Key,
}

impl AppState {
    pub fn from_config(config: TempoConfig) -> anyhow::Result<Self> {
        let tokens = TokenClient::new(OAuthConfig {
            client_id: config.provider.client_id.clone(),
            auth_url: config.provider.auth_url.clone(),
            token_url: config.provider.token_url.clone(),
            redirect_uri: config.provider.redirect_uri.clone(),
            scopes: config.provider.scopes.clone(),
        })?;
        let upstream = ResourceClient::new(&config.provider.api_base)?;
        let key = cookie_key(&config.cookies)?;

        Ok(Self {
            config: Arc::new(config),
            tokens,
            upstream,
            version: env!("CARGO_PKG_VERSION"),
            key,
        })
    }
}

// Lets `PrivateCookieJar` extract its key from our state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.key.clone()
    }
}

/// Resolve the cookie encryption key from config.
///
/// Without a configured secret an ephemeral key is generated: fine for
/// development, but every session dies with the process.
fn cookie_key(config: &CookieConfig) -> anyhow::Result<Key> {
    let Some(secret) = &config.secret else {
        warn!("cookies.secret not set, using an ephemeral key; sessions will not survive restart");
        return Ok(Key::generate());
    };

    let bytes = STANDARD
        .decode(secret.expose_secret())
        .map_err(|e| anyhow::anyhow!("cookies.secret is not valid base64: {e}"))?;
    if bytes.len() >= 64 {
        Ok(Key::from(&bytes))
    } else if bytes.len() >= 32 {
        Ok(Key::derive_from(&bytes))
    } else {
        anyhow::bail!(
            "cookies.secret must decode to at least 32 bytes, got {}",
            bytes.len()
        )
    }
}
