//! `$XDG_CONFIG_HOME/<app>/config.toml`: a raw `[env]` table plus an `[agent]`
//! table whose keys map to `BATS_*` variables.
//!
//! ```toml
//! [env]
//! OPENAI_API_KEY = "sk-..."
//!
//! [agent]
//! search_budget = 3
//! pivot = "reset"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

/// Prefix for keys coming from the `[agent]` table.
pub const AGENT_ENV_PREFIX: &str = "BATS_";

fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

/// Path of the app's config file, whether or not it exists.
pub fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    let home = config_home()
        .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".into()))?;
    Ok(home.join(app_name).join("config.toml"))
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    agent: toml::Table,
}

/// `search_budget` -> `BATS_SEARCH_BUDGET`.
fn agent_key(key: &str) -> String {
    format!(
        "{}{}",
        AGENT_ENV_PREFIX,
        key.trim().replace('-', "_").to_ascii_uppercase()
    )
}

fn scalar_to_string(key: &str, value: &toml::Value) -> Result<String, LoadError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(LoadError::XdgValue {
            key: key.to_string(),
            kind: other.type_str().to_string(),
        }),
    }
}

/// Env pairs from the config file. `[agent]` entries are translated; an explicit
/// `[env]` entry for the same variable wins. Missing file returns an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let file: ConfigFile = toml::from_str(&content)?;

    let mut out = HashMap::new();
    for (key, value) in &file.agent {
        out.insert(agent_key(key), scalar_to_string(key, value)?);
    }
    out.extend(file.env);
    Ok(out)
}
