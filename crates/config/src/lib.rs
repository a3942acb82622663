//! Configuration loading: file discovery, `${ENV_VAR}` substitution in raw
//! config text, and `FITGATE_*` environment overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config, set_config_dir},
    schema::{FitgateConfig, GatewayConfig, PkceConfig, VaultConfig},
};
