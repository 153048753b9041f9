// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::providers::sites::{self, profile_by_name};

pub const ENV_SOURCES_PATH: &str = "SOURCES_PATH";

/// Load the source registration order from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let names = parse_sources(&content, ext.as_str())?;
    validate(names)
}

/// Load sources using env var + fallbacks:
/// 1) $SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in order (TechCrunch, The Verge, Wired)
pub fn load_sources_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        bail!("{ENV_SOURCES_PATH} points to non-existent path");
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(sites::ALL.iter().map(|p| p.name.to_string()).collect())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("sources");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<String>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blanks, drop repeats (case-insensitive) keeping the first occurrence.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    }
    out
}

/// Map each entry to its canonical profile name; unknown names are an error.
fn validate(names: Vec<String>) -> Result<Vec<String>> {
    names
        .iter()
        .map(|n| {
            profile_by_name(n)
                .map(|p| p.name.to_string())
                .ok_or_else(|| anyhow!("unknown source in config: {n}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"sources = [" Wired ", "", "TechCrunch", "wired"]"#;
        let json = r#"["The Verge", "  TechCrunch  ", ""]"#;
        assert_eq!(
            parse_toml(toml).unwrap(),
            vec!["Wired".to_string(), "TechCrunch".to_string()]
        );
        assert_eq!(
            parse_json(json).unwrap(),
            vec!["The Verge".to_string(), "TechCrunch".to_string()]
        );
    }

    #[test]
    fn validate_canonicalizes_and_rejects_unknown() {
        let ok = validate(vec!["the verge".into(), "WIRED".into()]).unwrap();
        assert_eq!(ok, vec!["The Verge".to_string(), "Wired".to_string()]);
        assert!(validate(vec!["Slashdot".into()]).is_err());
    }
}
