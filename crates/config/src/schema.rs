//! Config schema types (provider, server, cookies).

use {
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub cookies: CookieConfig,
}

/// OAuth provider endpoints and client registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// OAuth client id issued by the provider. Required for login.
    pub client_id: String,

    /// Redirect URI registered with the provider. Required for login.
    pub redirect_uri: String,

    pub auth_url: String,
    pub token_url: String,

    /// Base URL of the provider's Web API. Must end with `/` so relative
    /// resource paths join underneath it.
    pub api_base: String,

    /// Scopes requested at authorization, space-joined on the wire.
    pub scopes: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: String::new(),
            auth_url: "https://accounts.spotify.com/authorize".into(),
            token_url: "https://accounts.spotify.com/api/token".into(),
            api_base: "https://api.spotify.com/v1/".into(),
            scopes: vec!["user-read-private".into(), "user-read-email".into()],
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,

    /// Public origin used when building browser redirects (dashboard and
    /// login-failed targets).
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8990,
            public_base_url: "http://127.0.0.1:8990".into(),
        }
    }
}

/// Cookie storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Base64-encoded key material for cookie encryption. At least 64 bytes
    /// once decoded. When absent an ephemeral key is generated at startup
    /// and sessions do not survive a restart.
    #[serde(skip_serializing)]
    pub secret: Option<SecretString>,

    /// Set the `Secure` attribute on all cookies. Enable behind TLS.
    pub secure: bool,
}

impl TempoConfig {
    /// Check the fields login cannot work without.
    ///
    /// Returns a list of human-readable problems; empty means usable.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.provider.client_id.trim().is_empty() {
            out.push("provider.client_id is not set".into());
        }
        if self.provider.redirect_uri.trim().is_empty() {
            out.push("provider.redirect_uri is not set".into());
        }
        if !self.provider.api_base.ends_with('/') {
            out.push("provider.api_base must end with '/'".into());
        }
        if self.cookies.secret.is_none() {
            out.push("cookies.secret is not set (sessions will not survive restarts)".into());
        }
        out
    }
}
