use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::FitgateConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["fitgate.toml", "fitgate.yaml", "fitgate.yml", "fitgate.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks in this
/// directory (project-local and user-global paths are skipped). Each call
/// replaces the previous override; used by tests for isolation.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(path);
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Load config from the given path (any supported format), applying
/// `${ENV_VAR}` substitution and `FITGATE_*` overrides.
pub fn load_config(path: &Path) -> anyhow::Result<FitgateConfig> {
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
/// 1. `./fitgate.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/fitgate/fitgate.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `FitgateConfig::default()` (with env overrides applied)
/// when no file is found or the file fails to parse.
pub fn discover_and_load() -> FitgateConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(config) => return config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    }
    let mut config = FitgateConfig::default();
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
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

    // User-global: ~/.config/fitgate/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("fitgate")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the data directory: `~/.fitgate/` on all platforms.
pub fn data_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join(".fitgate"))
        .unwrap_or_else(|| PathBuf::from(".fitgate"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<FitgateConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Individual `FITGATE_*` environment variables beat file values.
fn apply_env_overrides(config: &mut FitgateConfig) {
    if let Ok(v) = std::env::var("FITGATE_CLIENT_ID") {
        config.provider.client_id = v;
    }
    if let Ok(v) = std::env::var("FITGATE_REDIRECT_URI") {
        config.provider.redirect_uri = v;
    }
    if let Ok(v) = std::env::var("FITGATE_SCOPE") {
        config.provider.scope = v;
    }
    if let Ok(v) = std::env::var("FITGATE_AUTH_URL") {
        config.provider.auth_url = v;
    }
    if let Ok(v) = std::env::var("FITGATE_TOKEN_URL") {
        config.provider.token_url = v;
    }
    if let Ok(v) = std::env::var("FITGATE_API_BASE") {
        config.provider.api_base = v;
    }
    if let Ok(v) = std::env::var("FITGATE_BIND") {
        config.gateway.bind = v;
    }
    if let Ok(v) = std::env::var("FITGATE_PORT")
        && let Ok(port) = v.parse()
    {
        config.gateway.port = port;
    }
    if let Ok(v) = std::env::var("FITGATE_VAULT_PATH") {
        config.vault.path = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("FITGATE_PKCE_TTL_SECS")
        && let Ok(secs) = v.parse()
    {
        config.pkce.attempt_ttl_secs = secs;
    }
}
