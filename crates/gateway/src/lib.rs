//! Gateway: the HTTP face of tempo.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Build shared state (token client, resource client, cookie key)
//! 3. Start the axum server: auth routes + protected proxy routes
//!
//! All token/session logic lives in `tempo-oauth`; handlers here only wire
//! the cookie-backed secret store to that core and map typed errors to
//! HTTP responses.

pub mod cookies;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use {
    server::{build_app, start},
    state::AppState,
};
