//! Config schema (provider, gateway, vault, PKCE attempt TTL).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use fitgate_oauth::ProviderConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitgateConfig {
    pub provider: ProviderConfig,
    pub gateway: GatewayConfig,
    pub vault: VaultConfig,
    pub pkce: PkceConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Durable secret store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Path of the vault file. `None` uses `~/.fitgate/vault.json`.
    pub path: Option<PathBuf>,
}

impl VaultConfig {
    /// Resolve the vault file path, falling back to the data directory.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        crate::loader::data_dir().join("vault.json")
    }
}

/// PKCE handshake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PkceConfig {
    /// Seconds an authorization attempt stays consumable (5–15 minutes is
    /// the sane range; the provider's own code TTL caps the useful value).
    pub attempt_ttl_secs: u64,
}

impl Default for PkceConfig {
    fn default() -> Self {
        Self {
            attempt_ttl_secs: 600,
        }
    }
}
