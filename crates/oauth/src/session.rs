use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    error::AuthError,
    exchange::TokenClient,
    store::{SecretKey, SecretStore},
    types::TokenSet,
};

/// Observable session state at read time.
///
/// `Refreshing` is transient inside [`SessionManager::access_token`] and
/// `Invalid` is the terminal outcome reported as `SessionExpired`, so
/// neither is observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NoSession,
    Valid,
    Expired,
}

/// The single choke point between handlers and the stored token set.
///
/// Every protected call goes through [`access_token`]: it checks expiry
/// proactively on each read, refreshes when a refresh token is held, and
/// rewrites the store only after a fully successful exchange. On an
/// unrecoverable session the stale record is cleared so the next attempt
/// starts clean.
///
/// [`access_token`]: SessionManager::access_token
pub struct SessionManager<S> {
    store: S,
    tokens: TokenClient,
}

impl<S: SecretStore> SessionManager<S> {
    pub fn new(store: S, tokens: TokenClient) -> Self {
        Self { store, tokens }
    }

    /// Current state without side effects on the upstream.
    pub fn status(&self) -> SessionStatus {
        match self.peek() {
            None => SessionStatus::NoSession,
            Some(set) if set.is_expired() => SessionStatus::Expired,
            Some(_) => SessionStatus::Valid,
        }
    }

    /// Persist a freshly exchanged token set as the session record.
    pub fn establish(&mut self, tokens: &TokenSet) -> Result<(), AuthError> {
        let raw = serde_json::to_string(tokens)
            .map_err(|e| AuthError::Configuration(format!("serialize session: {e}")))?;
        self.store
            .put(SecretKey::Session, &raw, Duration::from_secs(tokens.expires_in));
        Ok(())
    }

    /// Return an access token no older than the safety margin, refreshing
    /// first when needed.
    pub async fn access_token(&mut self) -> Result<String, AuthError> {
        let Some(set) = self.load() else {
            return Err(AuthError::NotAuthenticated);
        };
        if !set.is_expired() {
            return Ok(set.access_token);
        }
        debug!("session expired, attempting refresh");
        self.refresh_session(set).await
    }

    /// Force an Expired → Refreshing → Valid transition regardless of the
    /// local timestamp. Used when the upstream rejected a token that still
    /// looked valid here.
    pub async fn force_refresh(&mut self) -> Result<String, AuthError> {
        let Some(set) = self.load() else {
            return Err(AuthError::NotAuthenticated);
        };
        self.refresh_session(set).await
    }

    /// Delete the session record. Idempotent.
    pub fn logout(&mut self) {
        self.store.delete(SecretKey::Session);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Read without mutating: corrupt records count as absent but stay put.
    fn peek(&self) -> Option<TokenSet> {
        let raw = self.store.get(SecretKey::Session)?;
        serde_json::from_str(&raw).ok()
    }

    fn load(&mut self) -> Option<TokenSet> {
        let raw = self.store.get(SecretKey::Session)?;
        match serde_json::from_str(&raw) {
            Ok(set) => Some(set),
            Err(e) => {
                // A record we cannot read is useless; delete it so the next
                // attempt starts from NoSession instead of re-parsing the
                // same broken entry until its TTL runs out.
                warn!(error = %e, "discarding unparseable session record");
                self.store.delete(SecretKey::Session);
                None
            },
        }
    }

    async fn refresh_session(&mut self, prior: TokenSet) -> Result<String, AuthError> {
        let Some(refresh_token) = prior.refresh_token.clone() else {
            self.store.delete(SecretKey::Session);
            return Err(AuthError::SessionExpired);
        };

        match self.tokens.refresh(&refresh_token).await {
            Ok(mut fresh) => {
                fresh.carry_refresh_from(&prior);
                self.establish(&fresh)?;
                Ok(fresh.access_token)
            },
            Err(e) => {
                // Refresh token revoked, rejected, or the exchange timed
                // out: the session is unrecoverable. Clear it so the stale
                // record cannot be replayed.
                warn!(error = %e, "session refresh failed");
                self.store.delete(SecretKey::Session);
                Err(AuthError::SessionExpired)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::MemoryStore,
        types::{EXPIRY_SAFETY_MARGIN_SECS, OAuthConfig, now_unix},
    };

    fn token_client(token_url: String) -> TokenClient {
        TokenClient::new(OAuthConfig {
            client_id: "client-1".into(),
            auth_url: "https://auth.example/authorize".into(),
            token_url,
            redirect_uri: "http://127.0.0.1:8990/auth/callback".into(),
            scopes: vec![],
        })
        .unwrap()
    }

    fn manager(token_url: String) -> SessionManager<MemoryStore> {
        SessionManager::new(MemoryStore::new(), token_client(token_url))
    }

    fn seed_session(mgr: &mut SessionManager<MemoryStore>, set: &TokenSet) {
        // Seed directly with a long store TTL so the entry itself is live
        // even when the token inside is past its expiry boundary.
        let raw = serde_json::to_string(set).unwrap();
        mgr.store
            .put(SecretKey::Session, &raw, Duration::from_secs(3600));
    }

    fn valid_set() -> TokenSet {
        TokenSet {
            access_token: "A".into(),
            token_type: "Bearer".into(),
            scope: None,
            expires_in: 3600,
            refresh_token: Some("R".into()),
            obtained_at: now_unix(),
        }
    }

    fn expired_set() -> TokenSet {
        let mut set = valid_set();
        set.obtained_at = now_unix() - 3600 - EXPIRY_SAFETY_MARGIN_SECS - 10;
        set
    }

    #[tokio::test]
    async fn no_session_is_not_authenticated() {
        let mut mgr = manager("http://127.0.0.1:1/token".into());
        assert_eq!(mgr.status(), SessionStatus::NoSession);
        assert!(matches!(
            mgr.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn valid_session_returns_token_without_network() {
        // Unroutable token URL: any refresh attempt would error out.
        let mut mgr = manager("http://127.0.0.1:1/token".into());
        seed_session(&mut mgr, &valid_set());

        assert_eq!(mgr.status(), SessionStatus::Valid);
        assert_eq!(mgr.access_token().await.unwrap(), "A");
    }

    #[tokio::test]
    async fn expired_session_refreshes_and_rewrites_store() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"B","expires_in":3600}"#)
            .create_async()
            .await;

        let mut mgr = manager(format!("{}/token", server.url()));
        seed_session(&mut mgr, &expired_set());

        assert_eq!(mgr.status(), SessionStatus::Expired);
        assert_eq!(mgr.access_token().await.unwrap(), "B");

        // Store holds the refreshed set, with the prior refresh token
        // carried forward because the response omitted one.
        let raw = mgr.store().get(SecretKey::Session).unwrap();
        let stored: TokenSet = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.access_token, "B");
        assert_eq!(stored.refresh_token.as_deref(), Some("R"));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_clears_session() {
        let mut mgr = manager("http://127.0.0.1:1/token".into());
        let mut set = expired_set();
        set.refresh_token = None;
        seed_session(&mut mgr, &set);

        assert!(matches!(
            mgr.access_token().await,
            Err(AuthError::SessionExpired)
        ));
        assert!(mgr.store().get(SecretKey::Session).is_none());
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let mut mgr = manager(format!("{}/token", server.url()));
        seed_session(&mut mgr, &expired_set());

        assert!(matches!(
            mgr.access_token().await,
            Err(AuthError::SessionExpired)
        ));
        assert!(mgr.store().get(SecretKey::Session).is_none());
        // A second read starts from NoSession, not another refresh.
        assert!(matches!(
            mgr.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn force_refresh_replaces_a_locally_valid_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"B","refresh_token":"R2","expires_in":3600}"#)
            .create_async()
            .await;

        let mut mgr = manager(format!("{}/token", server.url()));
        seed_session(&mut mgr, &valid_set());

        assert_eq!(mgr.force_refresh().await.unwrap(), "B");
        let raw = mgr.store().get(SecretKey::Session).unwrap();
        let stored: TokenSet = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let mut mgr = manager("http://127.0.0.1:1/token".into());
        seed_session(&mut mgr, &valid_set());
        mgr.logout();
        mgr.logout();
        assert_eq!(mgr.status(), SessionStatus::NoSession);
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_no_session_and_is_deleted() {
        let mut mgr = manager("http://127.0.0.1:1/token".into());
        mgr.store
            .put(SecretKey::Session, "not json", Duration::from_secs(600));
        assert_eq!(mgr.status(), SessionStatus::NoSession);
        assert!(matches!(
            mgr.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
        // The broken entry is gone, not lingering until its TTL.
        assert!(mgr.store().get(SecretKey::Session).is_none());
    }
}
