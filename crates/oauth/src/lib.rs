//! OAuth 2.0 Authorization-Code-with-PKCE core: challenge generation,
//! anti-CSRF state, token exchange, and the session lifecycle built on a
//! scoped secret store.
//!
//! Nothing here touches HTTP routing; the gateway crate wires these pieces
//! to axum handlers and a cookie-backed store.

pub mod error;
pub mod exchange;
pub mod pkce;
pub mod session;
pub mod store;
pub mod types;

pub use {
    error::AuthError,
    exchange::TokenClient,
    pkce::{PkcePair, challenge_for, generate_pkce, generate_state},
    session::{SessionManager, SessionStatus},
    store::{MemoryStore, SecretKey, SecretStore},
    types::{EXPIRY_SAFETY_MARGIN_SECS, OAuthConfig, TokenSet},
};
