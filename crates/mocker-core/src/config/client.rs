//! Client options as read from a config file.

use crate::transport::{FailurePolicy, Mode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How [`crate::client::MockerClient`] is set up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Interception script (modern) or controller page (legacy), relative to
    /// the page location
    pub script_url: String,
    /// Forced transport; detected from the environment when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Legacy only: fail requests whose reply takes longer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_timeout_ms: Option<u64>,
    #[serde(default)]
    pub on_handler_failure: FailurePolicy,
}

impl ClientConfig {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
            mode: None,
            reply_timeout_ms: None,
            on_handler_failure: FailurePolicy::default(),
        }
    }

    pub fn with_mode(mut self, mode: Option<Mode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::{load_config, parse_config};
    use crate::config::ConfigError;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    fn test_client_config_defaults() {
        let config: ClientConfig =
            parse_config(r#"{"scriptUrl": "/sw.js"}"#, "mocker.json").expect("Should parse");
        assert_eq!(config, ClientConfig::new("/sw.js"));
        assert_eq!(config.on_handler_failure, FailurePolicy::ErrorResponse);
        assert_eq!(config.reply_timeout(), None);
    }

    #[rstest]
    fn test_client_config_from_yaml_file() {
        let dir = TempDir::new().expect("Should create temp dir");
        let path = dir.path().join("mocker.yml");
        fs::write(
            &path,
            "scriptUrl: /mocker/controller.html\nmode: legacy\nreplyTimeoutMs: 1500\nonHandlerFailure: passThrough\n",
        )
        .expect("Should write");

        let config: ClientConfig = load_config(&path).expect("Should load");
        assert_eq!(config.script_url, "/mocker/controller.html");
        assert_eq!(config.mode, Some(Mode::Legacy));
        assert_eq!(config.reply_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.on_handler_failure, FailurePolicy::PassThrough);
    }

    #[rstest]
    #[case(r#"{"scriptUrl": "/sw.js", "mode": "hybrid"}"#)]
    #[case(r#"{"mode": "modern"}"#)]
    fn test_client_config_rejects_invalid(#[case] content: &str) {
        let result: Result<ClientConfig, _> = parse_config(content, "mocker.json");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[rstest]
    fn test_client_config_omits_unset_fields() {
        let json = serde_json::to_value(ClientConfig::new("/sw.js").with_mode(Some(Mode::Modern)))
            .expect("Should serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "scriptUrl": "/sw.js",
                "mode": "modern",
                "onHandlerFailure": "errorResponse"
            })
        );
    }
}
