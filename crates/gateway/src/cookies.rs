use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};

use tempo_oauth::{SecretKey, SecretStore};

/// `SecretStore` backed by an encrypted cookie jar: tamper-evident,
/// `HttpOnly` (invisible to page scripts), `SameSite=Lax` (the strictest
/// policy that still survives the authorization redirect), `Path=/`, with
/// `Max-Age` carrying the TTL.
///
/// The jar accumulates every mutation; hand it back with the response via
/// [`into_jar`](Self::into_jar) or nothing the handler did is persisted.
pub struct CookieSecretStore {
    jar: PrivateCookieJar,
    secure: bool,
}

fn cookie_name(key: SecretKey) -> &'static str {
    match key {
        SecretKey::PkceVerifier => "tempo_pkce_verifier",
        SecretKey::OauthState => "tempo_oauth_state",
        SecretKey::Session => "tempo_session",
    }
}

impl CookieSecretStore {
    pub fn new(jar: PrivateCookieJar, secure: bool) -> Self {
        Self { jar, secure }
    }

    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar
    }
}

impl SecretStore for CookieSecretStore {
    fn get(&self, key: SecretKey) -> Option<String> {
        self.jar
            .get(cookie_name(key))
            .map(|c| c.value().to_string())
    }

    fn put(&mut self, key: SecretKey, value: &str, ttl: Duration) {
        let cookie = Cookie::build((cookie_name(key), value.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(time::Duration::seconds(ttl.as_secs().min(i64::MAX as u64) as i64))
            .build();
        self.jar = self.jar.clone().add(cookie);
    }

    fn delete(&mut self, key: SecretKey) {
        // Removal cookie needs the same path to match in the browser.
        let removal = Cookie::build((cookie_name(key), "")).path("/").build();
        self.jar = self.jar.clone().remove(removal);
    }
}
