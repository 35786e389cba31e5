//! Transports bridging page requests to the router.
//!
//! - [`ModernTransport`]: interception events handled by a worker task
//! - [`LegacyTransport`]: serialized messages to a controller frame, matched
//!   back to callers through a correlation table
//!
//! Both resolve every request exactly once, with the handler's response or by
//! passing the request through to the [`Network`].

pub mod exchange;
pub mod legacy;
pub mod modern;
pub mod wire;

pub use legacy::{ControllerFrame, FrameEnd, FramePort, LegacyTransport};
pub use modern::ModernTransport;

use crate::http::{NativeRequest, NativeResponse};
use crate::router::HandlerFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Interception mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Legacy,
    Modern,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Legacy => f.write_str("legacy"),
            Mode::Modern => f.write_str("modern"),
        }
    }
}

/// What a transport does when a handler fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Answer `500` with the failure as a text body
    #[default]
    ErrorResponse,
    /// Let the original request reach the network
    PassThrough,
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Reply for unknown correlation id {0}")]
    CorrelationMismatch(u64),
    #[error("No reply for correlation id {id} within {timeout:?}")]
    Timeout { id: u64, timeout: Duration },
    #[error("Interception context is no longer available")]
    Disconnected,
    #[error("Request body has already been consumed")]
    BodyUsed,
    #[error("Network request failed: {0}")]
    Network(String),
    #[error("'{script}' is not same-origin with '{origin}'")]
    CrossOrigin { script: String, origin: String },
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Malformed message: {0}")]
    Wire(#[from] serde_json::Error),
}

/// Real network used for requests no route handles.
#[async_trait]
pub trait Network: Send + Sync {
    async fn send(&self, request: NativeRequest) -> anyhow::Result<NativeResponse>;
}

/// Capability-tagged request/response bridge.
#[async_trait]
pub trait Transport: Send + Sync {
    fn mode(&self) -> Mode;

    /// Deliver a page request and return its (mocked or real) response.
    async fn fetch(&self, request: NativeRequest) -> Result<NativeResponse, TransportError>;
}

pub(crate) async fn pass_through(
    network: &dyn Network,
    request: NativeRequest,
) -> Result<NativeResponse, TransportError> {
    network
        .send(request)
        .await
        .map_err(|e| TransportError::Network(format!("{e:#}")))
}

/// Response used by [`FailurePolicy::ErrorResponse`].
pub(crate) fn failure_response(failure: &HandlerFailure) -> NativeResponse {
    NativeResponse::new(500)
        .with_header("content-type", "text/plain;charset=UTF-8")
        .with_body(failure.to_string())
}

/// Scripts and controller pages must share the page's origin.
pub(crate) fn ensure_same_origin(script: &Url, page: &Url) -> Result<(), TransportError> {
    if script.origin() != page.origin() {
        return Err(TransportError::CrossOrigin {
            script: script.to_string(),
            origin: page.origin().ascii_serialization(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::http::ReadBody;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Network stub answering `599` with the request URL as body and
    /// recording every request it sees.
    #[derive(Default)]
    pub struct RecordingNetwork {
        pub seen: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNetwork {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn urls(&self) -> Vec<String> {
            self.seen.lock().iter().map(|(url, _)| url.clone()).collect()
        }
    }

    #[async_trait]
    impl Network for RecordingNetwork {
        async fn send(&self, mut request: NativeRequest) -> anyhow::Result<NativeResponse> {
            let url = request.url().to_string();
            let body = request.text()?;
            self.seen.lock().push((url.clone(), body));
            Ok(NativeResponse::new(599).with_body(url))
        }
    }

    pub struct DownNetwork;

    #[async_trait]
    impl Network for DownNetwork {
        async fn send(&self, _request: NativeRequest) -> anyhow::Result<NativeResponse> {
            anyhow::bail!("connection refused")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:3000/sw.js", "http://localhost:3000/app", true)]
    #[case("http://localhost:3001/sw.js", "http://localhost:3000/app", false)]
    #[case("https://localhost:3000/sw.js", "http://localhost:3000/app", false)]
    #[case("https://cdn.example.com/sw.js", "https://example.com/", false)]
    fn test_ensure_same_origin(#[case] script: &str, #[case] page: &str, #[case] ok: bool) {
        let script = Url::parse(script).expect("valid url");
        let page = Url::parse(page).expect("valid url");
        assert_eq!(ensure_same_origin(&script, &page).is_ok(), ok);
    }

    #[rstest]
    #[case(Mode::Legacy, "\"legacy\"")]
    #[case(Mode::Modern, "\"modern\"")]
    fn test_mode_serde(#[case] mode: Mode, #[case] json: &str) {
        assert_eq!(serde_json::to_string(&mode).expect("Should serialize"), json);
        assert_eq!(serde_json::from_str::<Mode>(json).expect("Should deserialize"), mode);
        assert_eq!(format!("\"{mode}\""), json);
    }

    #[rstest]
    #[case(FailurePolicy::ErrorResponse, "\"errorResponse\"")]
    #[case(FailurePolicy::PassThrough, "\"passThrough\"")]
    fn test_failure_policy_serde(#[case] policy: FailurePolicy, #[case] json: &str) {
        assert_eq!(serde_json::to_string(&policy).expect("Should serialize"), json);
    }

    #[rstest]
    fn test_failure_response() {
        use crate::http::ReadBody;
        let failure = HandlerFailure::NoResponse {
            route: "GET http://localhost/x".to_string(),
        };
        let mut response = failure_response(&failure);
        assert_eq!(response.status(), 500);
        assert!(response.text().expect("Should read").contains("without ending"));
    }
}
