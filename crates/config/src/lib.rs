//! Configuration loading, env overrides and validation.
//!
//! Config files: `fsbot.toml`, `fsbot.yaml`, `fsbot.yml` or `fsbot.json`,
//! searched in `./` then in the user config directory. `${ENV_VAR}` and
//! `${ENV_VAR:-default}` placeholders are substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{LoadedConfig, apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        ApiConfig, FsbotConfig, ServerConfig, SessionsConfig, StructureConfig, TelegramConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
