//! Error types for configuration loading.

use std::path::PathBuf;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Unknown file type
    #[error("Unknown file type: {0}")]
    UnknownFileType(String),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid glob pattern or unreadable match
    #[error("Invalid file pattern '{pattern}': {reason}")]
    Glob { pattern: String, reason: String },
}
