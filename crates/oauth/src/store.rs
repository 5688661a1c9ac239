use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// The closed set of secrets the flow is allowed to persist. Verifier and
/// state are attempt-scoped; the session is the durable token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKey {
    PkceVerifier,
    OauthState,
    Session,
}

impl SecretKey {
    /// Stable entry name, also used as the cookie name suffix.
    pub fn name(self) -> &'static str {
        match self {
            SecretKey::PkceVerifier => "pkce_verifier",
            SecretKey::OauthState => "oauth_state",
            SecretKey::Session => "session",
        }
    }
}

/// Short-lived, tamper-resistant storage scoped to one browser/client.
///
/// This is the only place the PKCE verifier, OAuth state, and session record
/// may live. TTL is enforced by the store: an entry read after its TTL has
/// elapsed behaves as absent. `delete` is idempotent.
pub trait SecretStore {
    fn get(&self, key: SecretKey) -> Option<String>;
    fn put(&mut self, key: SecretKey, value: &str, ttl: Duration);
    fn delete(&mut self, key: SecretKey);
}

impl<T: SecretStore> SecretStore for &mut T {
    fn get(&self, key: SecretKey) -> Option<String> {
        (**self).get(key)
    }

    fn put(&mut self, key: SecretKey, value: &str, ttl: Duration) {
        (**self).put(key, value, ttl);
    }

    fn delete(&mut self, key: SecretKey) {
        (**self).delete(key);
    }
}

/// In-process store with `Instant`-based TTLs. The production store is the
/// gateway's encrypted cookie jar; this one backs tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<SecretKey, Entry>,
}

#[derive(Debug)]
struct Entry {
    value: String,
    deadline: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, key: SecretKey) -> Option<String> {
        let entry = self.entries.get(&key)?;
        if Instant::now() >= entry.deadline {
            return None;
        }
        Some(entry.value.clone())
    }

    fn put(&mut self, key: SecretKey, value: &str, ttl: Duration) {
        self.entries.insert(key, Entry {
            value: value.to_string(),
            deadline: Instant::now() + ttl,
        });
    }

    fn delete(&mut self, key: SecretKey) {
        self.entries.remove(&key);
    }
}
