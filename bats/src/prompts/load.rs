//! Load prompt templates from a directory of YAML files.
//!
//! **Canonical source**: default prompt text lives in `bats/prompts/*.yaml`; it is
//! embedded at compile time and used for any file the directory does not provide.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{PromptTemplate, ResearchPrompts};

macro_rules! embed_prompt_yaml {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}
const EMBED_THINK: &str = embed_prompt_yaml!("think.yaml");
const EMBED_VERIFY: &str = embed_prompt_yaml!("verify.yaml");
const EMBED_FINALIZE: &str = embed_prompt_yaml!("finalize.yaml");

const THINK_FILE: &str = "think.yaml";
const VERIFY_FILE: &str = "verify.yaml";
const FINALIZE_FILE: &str = "finalize.yaml";

/// Default directory name when `PROMPTS_DIR` is not set.
const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Error when loading prompts from a directory (missing dir, unreadable file, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

/// `dir` if given, else `PROMPTS_DIR`, else `./prompts`.
fn prompts_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_DIR))
    })
}

fn read_yaml_file<T>(dir: &Path, name: &str) -> Result<Option<T>, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    let value: T = serde_yaml::from_str(&content).map_err(|e| LoadError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(value))
}

/// Keeps `fallback` parts that the file left empty.
fn merge(file: Option<PromptTemplate>, fallback: PromptTemplate) -> PromptTemplate {
    match file {
        None => fallback,
        Some(t) => PromptTemplate {
            system: if t.system.trim().is_empty() {
                fallback.system
            } else {
                t.system
            },
            user: if t.user.trim().is_empty() {
                fallback.user
            } else {
                t.user
            },
        },
    }
}

/// Loads `think.yaml`, `verify.yaml` and `finalize.yaml` from `dir` (or `PROMPTS_DIR`).
///
/// Missing files and empty fields keep the embedded defaults. Errors only when the
/// directory is missing or a present file cannot be read or parsed.
pub fn load(dir: Option<&Path>) -> Result<ResearchPrompts, LoadError> {
    let base = prompts_dir(dir);
    if !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }
    let defaults = default_from_embedded();
    Ok(ResearchPrompts {
        think: merge(read_yaml_file(&base, THINK_FILE)?, defaults.think),
        verify: merge(read_yaml_file(&base, VERIFY_FILE)?, defaults.verify),
        finalize: merge(read_yaml_file(&base, FINALIZE_FILE)?, defaults.finalize),
    })
}

/// Parses the embedded default YAML.
pub fn default_from_embedded() -> ResearchPrompts {
    ResearchPrompts {
        think: serde_yaml::from_str(EMBED_THINK).unwrap_or_default(),
        verify: serde_yaml::from_str(EMBED_VERIFY).unwrap_or_default(),
        finalize: serde_yaml::from_str(EMBED_FINALIZE).unwrap_or_default(),
    }
}

/// Loads from `dir` if the directory exists; otherwise the embedded defaults.
pub fn load_or_default(dir: Option<&Path>) -> ResearchPrompts {
    load(dir).unwrap_or_else(|_| default_from_embedded())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_with_placeholders() {
        let p = default_from_embedded();
        assert!(p.think.user.contains("{question}"));
        assert!(p.think.system.contains("<tool_code>"));
        assert!(p.verify.system.contains("trajectory_summary"));
        assert!(p.finalize.system.contains("<answer>"));
    }

    #[test]
    fn load_nonexistent_dir_returns_error() {
        let result = load(Some(Path::new("/nonexistent_prompts_dir_12345")));
        assert!(matches!(result, Err(LoadError::DirNotFound(_))));
        let p = load_or_default(Some(Path::new("/nonexistent_prompts_dir_12345")));
        assert_eq!(p, default_from_embedded());
    }

    #[test]
    fn file_overrides_only_given_fields() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("verify.yaml"), "system: \"Be strict.\"\n").unwrap();
        let p = load(Some(temp.path())).unwrap();
        let defaults = default_from_embedded();
        assert_eq!(p.verify.system, "Be strict.");
        assert_eq!(p.verify.user, defaults.verify.user);
        assert_eq!(p.think, defaults.think);
    }

    #[test]
    fn invalid_yaml_returns_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("think.yaml"), "system: [not closed").unwrap();
        let err = load(Some(temp.path())).unwrap_err();
        assert!(matches!(err, LoadError::ParseYaml { .. }));
    }
}
