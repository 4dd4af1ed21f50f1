//! Loads `.env` and `$XDG_CONFIG_HOME/<app>/config.toml` into the process
//! environment with priority **existing env > .env > config.toml**.
//!
//! The agent itself only reads environment variables (`AgentConfig::from_env`), so
//! both files are just alternative ways of setting them.

mod dotenv;
mod xdg_toml;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

pub use xdg_toml::{config_path, AGENT_ENV_PREFIX};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("[agent] {key}: expected a string, number or boolean, got {kind}")]
    XdgValue { key: String, kind: String },
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Where an applied variable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Dotenv,
    ConfigFile,
}

/// Variables set by [`load_and_apply`], keyed by name. Values are not kept.
pub type Applied = BTreeMap<String, Source>;

/// Sets every variable found in `.env` or `config.toml` that is not already set.
///
/// * `app_name`: directory under the config home, e.g. `"bats"`.
/// * `override_dir`: where to look for `.env` instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Applied, LoadError> {
    let file_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let mut applied = Applied::new();
    let candidates = dotenv_map
        .iter()
        .map(|(k, v)| (k, v, Source::Dotenv))
        .chain(file_map.iter().map(|(k, v)| (k, v, Source::ConfigFile)));
    for (key, value, source) in candidates {
        if applied.contains_key(key) || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
        applied.insert(key.clone(), source);
    }
    Ok(applied)
}
