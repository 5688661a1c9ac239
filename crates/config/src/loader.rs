use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::TempoConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["tempo.toml", "tempo.yaml", "tempo.yml", "tempo.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, config discovery only looks in
/// this directory (project-local and user-global paths are skipped).
/// Can be called multiple times (e.g. in tests) — each call replaces the
/// previous override.
pub fn set_config_dir(path: PathBuf) {
    *lock_override() = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *lock_override() = None;
}

fn lock_override() -> std::sync::MutexGuard<'static, Option<PathBuf>> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<TempoConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./tempo.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/tempo/tempo.{toml,yaml,yml,json}` (user-global)
///
/// Returns defaults (plus `TEMPO_*` env overrides) if no file is found.
pub fn discover_and_load() -> TempoConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    let mut config = TempoConfig::default();
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched —
/// project-local and user-global paths are skipped for isolation.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = lock_override().clone() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
        // Override is set — don't fall through to other locations.
        return None;
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/tempo/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("tempo")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<TempoConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Override individual fields from `TEMPO_*` environment variables.
///
/// Env vars win over file values so deployments can keep secrets out of the
/// config file entirely.
fn apply_env_overrides(config: &mut TempoConfig) {
    if let Ok(v) = std::env::var("TEMPO_CLIENT_ID") {
        config.provider.client_id = v;
    }
    if let Ok(v) = std::env::var("TEMPO_REDIRECT_URI") {
        config.provider.redirect_uri = v;
    }
    if let Ok(v) = std::env::var("TEMPO_AUTH_URL") {
        config.provider.auth_url = v;
    }
    if let Ok(v) = std::env::var("TEMPO_TOKEN_URL") {
        config.provider.token_url = v;
    }
    if let Ok(v) = std::env::var("TEMPO_API_BASE") {
        config.provider.api_base = v;
    }
    if let Ok(v) = std::env::var("TEMPO_SCOPES") {
        config.provider.scopes = v.split_whitespace().map(str::to_string).collect();
    }
    if let Ok(v) = std::env::var("TEMPO_BIND") {
        config.server.bind = v;
    }
    if let Ok(v) = std::env::var("TEMPO_PORT")
        && let Ok(port) = v.parse()
    {
        config.server.port = port;
    }
    if let Ok(v) = std::env::var("TEMPO_PUBLIC_BASE_URL") {
        config.server.public_base_url = v;
    }
    if let Ok(v) = std::env::var("TEMPO_COOKIE_SECRET") {
        config.cookies.secret = Some(v.into());
    }
    if let Ok(v) = std::env::var("TEMPO_COOKIE_SECURE") {
        config.cookies.secure = v == "1" || v.eq_ignore_ascii_case("true");
    }
}
