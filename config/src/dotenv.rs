//! `.env` parsing. Values are only collected here; `lib` decides what gets applied.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return value[1..value.len() - 1].replace("\\\"", "\"");
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].to_string();
    }
    // Unquoted: ` #` starts a trailing comment.
    match value.find(" #") {
        Some(i) => value[..i].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// `KEY=VALUE` per line; `#` lines and blanks skipped; an `export ` prefix is allowed.
fn parse_dotenv(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let l = l.strip_prefix("export ").unwrap_or(l);
            let (k, v) = l.split_once('=')?;
            let key = k.trim();
            (!key.is_empty()).then(|| (key.to_string(), unquote(v.trim())))
        })
        .collect()
}

/// Reads `.env` from `override_dir` or the current directory. Missing file gives an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> std::io::Result<HashMap<String, String>> {
    match dotenv_path(override_dir) {
        Some(path) => Ok(parse_dotenv(&std::fs::read_to_string(path)?)),
        None => Ok(HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_exported_pairs() {
        let m = parse_dotenv("OPENAI_MODEL=gpt-4o-mini\nexport BATS_PIVOT=reset\n");
        assert_eq!(m.get("OPENAI_MODEL").map(String::as_str), Some("gpt-4o-mini"));
        assert_eq!(m.get("BATS_PIVOT").map(String::as_str), Some("reset"));
    }

    #[test]
    fn skips_comments_blanks_and_malformed_lines() {
        let m = parse_dotenv("\n# comment\nNOT_A_PAIR\n=orphan\nKEY=val\n");
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("KEY").map(String::as_str), Some("val"));
    }

    #[test]
    fn quotes_and_trailing_comments() {
        let m = parse_dotenv(
            "A=\"hello # world\"\nB='single'\nC=3 # search calls\nD=\"say \\\"hi\\\"\"\nE=\n",
        );
        assert_eq!(m.get("A").map(String::as_str), Some("hello # world"));
        assert_eq!(m.get("B").map(String::as_str), Some("single"));
        assert_eq!(m.get("C").map(String::as_str), Some("3"));
        assert_eq!(m.get("D").map(String::as_str), Some("say \"hi\""));
        assert_eq!(m.get("E").map(String::as_str), Some(""));
    }

    #[test]
    fn load_env_map_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_map(Some(dir.path())).unwrap().is_empty());
    }

    #[test]
    fn load_env_map_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "BATS_BUDGET=search=1\n").unwrap();
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("BATS_BUDGET").map(String::as_str), Some("search=1"));
    }
}
