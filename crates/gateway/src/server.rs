use std::net::SocketAddr;

use {
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use tempo_config::TempoConfig;

use crate::{routes, state::AppState};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/login", get(routes::auth::login))
        .route("/auth/callback", get(routes::auth::callback))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/api/me", get(routes::stats::me))
        .route("/api/me/top", get(routes::stats::top))
        .route(
            "/api/me/player/currently-playing",
            get(routes::stats::currently_playing),
        )
        .layer(cors)
        .with_state(state)
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Start the gateway HTTP server and serve until shutdown.
pub async fn start(config: TempoConfig) -> anyhow::Result<()> {
    for problem in config.problems() {
        tracing::warn!(%problem, "config problem");
    }

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let provider = config.provider.auth_url.clone();
    let state = AppState::from_config(config)?;

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("tempo gateway v{}", state.version),
        format!("listening on {addr}"),
        format!("provider: {provider}"),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}
