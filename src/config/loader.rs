// Configuration loader
// Defaults, then ~/.safewalk/config.toml (or --config), then .env and the environment

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Load configuration.
///
/// An explicit `path` must exist; the default path is optional. Environment
/// variables (including those from a `.env` file in the working directory)
/// override values from the file.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("Failed to read .env file"),
    }

    let mut config = match path {
        Some(path) => load_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => load_file(&path)?,
            _ => Config::default(),
        },
    };

    apply_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// ~/.safewalk/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".safewalk").join("config.toml"))
}

fn load_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config TOML at {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Overlay environment variables onto `config`. Empty values are ignored.
pub fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("VAPI_TOKEN") {
        config.vapi.token = Some(v);
    }
    if let Some(v) = get("VAPI_BASE_URL") {
        config.vapi.base_url = v;
    }
    if let Some(v) = get("PHONE_ID") {
        config.vapi.phone_id = Some(v);
    }
    if let Some(v) = get("PERMANENT_ID") {
        config.vapi.assistant_id = Some(v);
    }
    if let Some(v) = get("SAFEWALK_BIND") {
        config.server.bind_address = v;
    }
    if let Some(v) = get("SAFEWALK_DEFAULT_PERSONA") {
        config.server.default_persona = v;
    }
    if let Some(v) = get("SAFE_PHRASE") {
        config.call.safe_phrase = v;
    }
    if let Some(v) = get("TRANSFER_NUMBER") {
        config.call.transfer_number = Some(v);
    }
}
