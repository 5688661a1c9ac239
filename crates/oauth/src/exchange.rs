use std::time::Duration;

use {
    reqwest::header::CACHE_CONTROL,
    serde::Deserialize,
    tracing::{debug, warn},
    url::Url,
};

use crate::{
    error::AuthError,
    types::{OAuthConfig, TokenSet, now_unix},
};

/// Bound on any single call to the token endpoint. A timeout surfaces as
/// `AuthError::Network`, same as any other transport failure.
const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);

/// Which grant a request carries, for error attribution.
#[derive(Clone, Copy)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

/// Client for the authorization server: builds the authorize redirect and
/// performs the two token-endpoint exchanges. Single-shot, no retries.
#[derive(Debug, Clone)]
pub struct TokenClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl TokenClient {
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(TOKEN_TIMEOUT).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the `/authorize` redirect URL for a login attempt.
    pub fn authorize_url(&self, challenge: &str, state: &str) -> Result<Url, AuthError> {
        if self.config.client_id.trim().is_empty() {
            return Err(AuthError::Configuration("client_id is not set".into()));
        }
        if self.config.redirect_uri.trim().is_empty() {
            return Err(AuthError::Configuration("redirect_uri is not set".into()));
        }

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Configuration(format!("invalid auth_url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", challenge);
        Ok(url)
    }

    /// Exchange an authorization code (plus its PKCE verifier) for tokens.
    ///
    /// Stamps `obtained_at` with the current time on success.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::InvalidRequest("empty authorization code"));
        }
        if verifier.trim().is_empty() {
            return Err(AuthError::InvalidRequest("empty code verifier"));
        }

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ];
        self.post_token(&form, Grant::AuthorizationCode).await
    }

    /// Redeem a refresh token for a fresh token set.
    ///
    /// The provider may omit a new refresh token; the caller merges the
    /// prior one via [`TokenSet::carry_refresh_from`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidRequest("empty refresh token"));
        }

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.post_token(&form, Grant::RefreshToken).await
    }

    async fn post_token(&self, form: &[(&str, &str)], grant: Grant) -> Result<TokenSet, AuthError> {
        // The token endpoint is not idempotent-cacheable.
        let resp = self
            .http
            .post(&self.config.token_url)
            .header(CACHE_CONTROL, "no-store")
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token endpoint rejected request");
            return Err(match grant {
                Grant::AuthorizationCode => AuthError::TokenExchange {
                    status: status.as_u16(),
                    body,
                },
                Grant::RefreshToken => AuthError::TokenRefresh {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let wire: TokenResponse = resp.json().await?;
        debug!(expires_in = wire.expires_in, "token endpoint returned a set");
        Ok(wire.into_token_set(now_unix()))
    }
}

/// Wire shape of a token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self, obtained_at: u64) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
            scope: self.scope,
            expires_in: self.expires_in,
            refresh_token: self.refresh_token,
            obtained_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(token_url: String) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-1".into(),
            auth_url: "https://auth.example/authorize".into(),
            token_url,
            redirect_uri: "http://127.0.0.1:8990/auth/callback".into(),
            scopes: vec!["user-read-private".into(), "user-read-email".into()],
        }
    }

    fn client(token_url: String) -> TokenClient {
        TokenClient::new(test_config(token_url)).unwrap()
    }

    #[test]
    fn authorize_url_carries_pkce_params() {
        let c = client("https://auth.example/token".into());
        let url = c.authorize_url("chal123", "state456").unwrap();
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |k: &str| {
            query
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("client_id"), Some("client-1"));
        assert_eq!(get("code_challenge_method"), Some("S256"));
        assert_eq!(get("code_challenge"), Some("chal123"));
        assert_eq!(get("state"), Some("state456"));
        assert_eq!(get("scope"), Some("user-read-private user-read-email"));
    }

    #[test]
    fn authorize_url_without_client_id_is_a_config_error() {
        let mut config = test_config("https://auth.example/token".into());
        config.client_id = String::new();
        let c = TokenClient::new(config).unwrap();
        assert!(matches!(
            c.authorize_url("chal", "state"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn exchange_stamps_obtained_at() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_header("cache-control", "no-store")
            .with_status(200)
            .with_body(
                r#"{"access_token":"A","token_type":"Bearer","expires_in":3600,"refresh_token":"R"}"#,
            )
            .create_async()
            .await;

        let c = client(format!("{}/token", server.url()));
        let before = now_unix();
        let tokens = c.exchange_code("abc", "verifier").await.unwrap();
        mock.assert_async().await;

        assert_eq!(tokens.access_token, "A");
        assert_eq!(tokens.refresh_token.as_deref(), Some("R"));
        assert!(tokens.obtained_at >= before);
        assert!(tokens.obtained_at <= now_unix());
    }

    #[tokio::test]
    async fn exchange_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let c = client(format!("{}/token", server.url()));
        match c.exchange_code("abc", "verifier").await {
            Err(AuthError::TokenExchange { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            },
            other => panic!("expected TokenExchange error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_error_is_distinct_from_exchange_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let c = client(format!("{}/token", server.url()));
        assert!(matches!(
            c.refresh("stale").await,
            Err(AuthError::TokenRefresh { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected_without_a_request() {
        let c = client("http://127.0.0.1:1/token".into());
        assert!(matches!(
            c.exchange_code("", "v").await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            c.exchange_code("abc", " ").await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            c.refresh("").await,
            Err(AuthError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn refresh_sends_refresh_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "R".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "client-1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"B","expires_in":3600}"#)
            .create_async()
            .await;

        let c = client(format!("{}/token", server.url()));
        let tokens = c.refresh("R").await.unwrap();
        mock.assert_async().await;

        assert_eq!(tokens.access_token, "B");
        // Provider omitted a rotated refresh token; the session layer merges
        // the prior one back in.
        assert!(tokens.refresh_token.is_none());
    }
}
