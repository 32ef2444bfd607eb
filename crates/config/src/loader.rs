use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{env_subst::substitute_env, schema::FsbotConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["fsbot.toml", "fsbot.yaml", "fsbot.yml", "fsbot.json"];

/// A loaded config together with where it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: FsbotConfig,
    pub path: Option<PathBuf>,
    /// Raw document as JSON, kept for unknown-field validation.
    pub raw: Option<serde_json::Value>,
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<FsbotConfig> {
    let value = load_config_value(path)?;
    serde_json::from_value(value)
        .map_err(|e| anyhow::anyhow!("invalid config in {}: {e}", path.display()))
}

/// Read `path`, substitute `${VAR}` placeholders and parse it into a
/// format-neutral JSON value.
pub fn load_config_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config_value(&raw, path)
}

/// Load config from `explicit`, or discover it in standard locations.
///
/// Search order when no path is given:
/// 1. `./fsbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/fsbot/fsbot.{toml,yaml,yml,json}` (user-global)
///
/// A missing file falls back to defaults; a file that exists but does not
/// parse is an error. An explicit path must exist.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let path = match explicit {
        Some(p) if !p.exists() => anyhow::bail!("config file not found: {}", p.display()),
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok(LoadedConfig::default());
    };

    debug!(path = %path.display(), "loading config");
    let raw = load_config_value(&path)?;
    let config = serde_json::from_value(raw.clone())
        .map_err(|e| anyhow::anyhow!("invalid config in {}: {e}", path.display()))?;
    info!(path = %path.display(), "config loaded");

    Ok(LoadedConfig {
        config,
        path: Some(path),
        raw: Some(raw),
    })
}

/// Overlay process environment variables on top of `config`.
///
/// `FSBOT_*` names win over the bare ones (`TOKEN`, `WEBHOOK_URL`, `PORT`)
/// that container platforms commonly inject.
pub fn apply_env_overrides(config: &mut FsbotConfig) -> anyhow::Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    config: &mut FsbotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    let get = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| lookup(n).filter(|v| !v.trim().is_empty()))
    };

    if let Some(token) = get(&["FSBOT_TOKEN", "TOKEN"]) {
        config.telegram.token = Some(Secret::new(token.trim().to_string()));
    }
    if let Some(url) = get(&["FSBOT_WEBHOOK_URL", "WEBHOOK_URL"]) {
        config.telegram.webhook_url = Some(url.trim().to_string());
    }
    if let Some(secret) = get(&["FSBOT_WEBHOOK_SECRET"]) {
        config.telegram.webhook_secret = Some(Secret::new(secret.trim().to_string()));
    }
    if let Some(bind) = get(&["FSBOT_BIND"]) {
        config.server.bind = bind.trim().to_string();
    }
    if let Some(port) = get(&["FSBOT_PORT", "PORT"]) {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid port {port:?}: {e}"))?;
    }
    Ok(())
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/fsbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "fsbot").map(|d| d.config_dir().to_path_buf())
}

fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
