//! Bearer-authenticated client for the provider's Web API.
//!
//! Thin by design: one GET, JSON out, failures classified so callers can
//! tell "token rejected" (retry after refresh) from "rate limited" (back
//! off) from everything else.

use std::time::Duration;

use {
    reqwest::{
        StatusCode,
        header::{CACHE_CONTROL, RETRY_AFTER},
    },
    serde_json::Value,
    thiserror::Error,
    tracing::debug,
    url::Url,
};

/// Bound on any single resource call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Non-auth failure taxonomy for resource calls.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API rejected the bearer token (HTTP 401). The caller may retry
    /// exactly once after a forced refresh.
    #[error("upstream rejected the access token")]
    Unauthorized,

    /// HTTP 429. Never triggers a refresh; surfaced so the caller can back
    /// off.
    #[error("rate limited by upstream")]
    RateLimited { retry_after: Option<u64> },

    /// Any other non-2xx response.
    #[error("upstream request failed with status {status}")]
    Status { status: u16 },

    /// A caller passed an empty access token; no request was made.
    #[error("empty access token")]
    MissingToken,

    /// Resource path did not join onto the API base.
    #[error("invalid resource path: {0}")]
    Path(#[from] url::ParseError),

    /// Transport failure, timeouts included.
    #[error("upstream unreachable: {0}")]
    Network(#[from] reqwest::Error),
}

/// Client for GET requests against the provider API base.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    api_base: Url,
    http: reqwest::Client,
}

impl ResourceClient {
    /// `api_base` must end with `/` so relative paths join underneath it.
    pub fn new(api_base: &str) -> Result<Self, UpstreamError> {
        let api_base = Url::parse(api_base)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { api_base, http })
    }

    /// Fetch `path` (relative, query string allowed) with bearer auth and
    /// relay the JSON body.
    ///
    /// A 204 comes back as JSON null — the provider's "nothing playing"
    /// answer has no body.
    pub async fn get_json(&self, path: &str, access_token: &str) -> Result<Value, UpstreamError> {
        if access_token.trim().is_empty() {
            return Err(UpstreamError::MissingToken);
        }

        let url = self.api_base.join(path.trim_start_matches('/'))?;
        debug!(path, "upstream GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::NO_CONTENT => Ok(Value::Null),
            s if s.is_success() => Ok(resp.json().await?),
            StatusCode::UNAUTHORIZED => Err(UpstreamError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = resp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Err(UpstreamError::RateLimited { retry_after })
            },
            s => Err(UpstreamError::Status {
                status: s.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ResourceClient {
        ResourceClient::new(&format!("{base}/v1/")).unwrap()
    }

    #[tokio::test]
    async fn relays_json_body_with_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/me")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"user-1"}"#)
            .create_async()
            .await;

        let body = client(&server.url()).get_json("me", "tok").await.unwrap();
        mock.assert_async().await;
        assert_eq!(body["id"], "user-1");
    }

    #[tokio::test]
    async fn no_content_maps_to_null() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/me/player/currently-playing")
            .with_status(204)
            .create_async()
            .await;

        let body = client(&server.url())
            .get_json("me/player/currently-playing", "tok")
            .await
            .unwrap();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn classifies_401() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/me")
            .with_status(401)
            .create_async()
            .await;

        assert!(matches!(
            client(&server.url()).get_json("me", "tok").await,
            Err(UpstreamError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn classifies_429_with_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/me")
            .with_status(429)
            .with_header("retry-after", "17")
            .create_async()
            .await;

        match client(&server.url()).get_json("me", "tok").await {
            Err(UpstreamError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(17));
            },
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_statuses_pass_through() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/me")
            .with_status(503)
            .create_async()
            .await;

        assert!(matches!(
            client(&server.url()).get_json("me", "tok").await,
            Err(UpstreamError::Status { status: 503 })
        ));
    }

    #[tokio::test]
    async fn empty_token_never_hits_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/me")
            .expect(0)
            .create_async()
            .await;

        assert!(matches!(
            client(&server.url()).get_json("me", "  ").await,
            Err(UpstreamError::MissingToken)
        ));
        mock.assert_async().await;
    }
}
