//! Configuration file parsing (YAML/JSON/JSONC).

use crate::config::error::ConfigError;
use crate::types::fixture::Fixture;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFileType {
    Yaml,
    Json,
    Jsonc,
    Unknown,
}

/// Get config file type from path extension
pub fn get_file_type(path: &str) -> ConfigFileType {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "yaml" | "yml" => ConfigFileType::Yaml,
        "json" => ConfigFileType::Json,
        "jsonc" => ConfigFileType::Jsonc,
        _ => ConfigFileType::Unknown,
    }
}

/// Strip `//` and `/* */` comments outside of string literals
pub fn strip_json_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                // Keep the line break so line numbers in errors stay right
                while let Some(&next) = chars.peek() {
                    if next == '\n' || next == '\r' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => result.push(c),
        }
    }

    result
}

/// Parse JSON content
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    serde_json::from_str(content).map_err(ConfigError::from)
}

/// Parse JSONC content (JSON with comments)
pub fn parse_jsonc<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    let stripped = strip_json_comments(content);
    serde_json::from_str(&stripped).map_err(ConfigError::from)
}

/// Parse YAML content
pub fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    serde_yaml::from_str(content).map_err(ConfigError::from)
}

/// Parse config content based on file type
pub fn parse_config<T: DeserializeOwned>(content: &str, path: &str) -> Result<T, ConfigError> {
    match get_file_type(path) {
        ConfigFileType::Yaml => parse_yaml(content),
        ConfigFileType::Json => parse_json(content),
        ConfigFileType::Jsonc => parse_jsonc(content),
        ConfigFileType::Unknown => Err(ConfigError::UnknownFileType(path.to_string())),
    }
}

/// Read and parse a single config file
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, &path.to_string_lossy())
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Resolve a path or glob pattern to the files it names, sorted
pub fn resolve_files(pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    if !is_glob(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let glob_error = |reason: String| ConfigError::Glob {
        pattern: pattern.to_string(),
        reason,
    };

    let mut files = glob::glob(pattern)
        .map_err(|e| glob_error(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| glob_error(e.to_string()))?;
    files.sort();

    if files.is_empty() {
        warn!("No fixture files match '{}'", pattern);
    }
    Ok(files)
}

/// Load fixtures from a file or from every file a glob pattern matches.
///
/// Each file holds a list of fixtures; results keep file order, then
/// in-file order.
pub fn load_fixtures(pattern: &str) -> Result<Vec<Fixture>, ConfigError> {
    let mut fixtures = Vec::new();
    for file in resolve_files(pattern)? {
        let mut loaded: Vec<Fixture> = load_config(&file)?;
        debug!("Loaded {} fixtures from {}", loaded.len(), file.display());
        fixtures.append(&mut loaded);
    }
    Ok(fixtures)
}
