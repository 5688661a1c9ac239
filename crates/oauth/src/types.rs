use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// OAuth 2.0 provider configuration for a public (PKCE) client.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

/// Seconds before the literal expiry boundary at which a token set is
/// already treated as expired, so a request never races the upstream clock.
pub const EXPIRY_SAFETY_MARGIN_SECS: u64 = 60;

/// The token bundle returned by the token endpoint, stamped with the time it
/// was obtained. Serialized wholesale as the session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Access-token lifetime in seconds, as reported by the provider.
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp at which this set was obtained.
    pub obtained_at: u64,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl TokenSet {
    /// Unix timestamp of the literal expiry boundary.
    pub fn expires_at(&self) -> u64 {
        self.obtained_at.saturating_add(self.expires_in)
    }

    /// Whether the set counts as expired at `now` (safety margin applied).
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_add(EXPIRY_SAFETY_MARGIN_SECS) >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_unix())
    }

    /// Carry the previous refresh token forward when a refresh response
    /// omitted one. A held refresh token is never silently dropped.
    pub fn carry_refresh_from(&mut self, prior: &TokenSet) {
        if self.refresh_token.is_none() {
            self.refresh_token = prior.refresh_token.clone();
        }
    }
}

/// Current Unix time in seconds.
pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
