//! Page-side entry point: pick a transport and issue requests through it.

mod environment;

pub use environment::Environment;

use crate::config::ClientConfig;
use crate::http::{NativeRequest, NativeResponse};
use crate::router::Router;
use crate::transport::{
    LegacyTransport, Mode, ModernTransport, Network, Transport, TransportError,
};
use crate::types::method::HttpMethod;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Create a client for `script_url` with default options.
///
/// `force` bypasses detection. Without it the modern transport is used when
/// the environment supports it; otherwise a warning is logged and the legacy
/// transport is used.
pub fn create_client(
    script_url: &str,
    force: Option<Mode>,
    environment: &Environment,
    router: Router,
    network: Arc<dyn Network>,
) -> Result<MockerClient, TransportError> {
    let config = ClientConfig::new(script_url).with_mode(force);
    MockerClient::from_config(&config, environment, router, network)
}

/// Issues page requests through the selected transport.
pub struct MockerClient {
    transport: Arc<dyn Transport>,
    location: Url,
}

impl MockerClient {
    pub fn from_config(
        config: &ClientConfig,
        environment: &Environment,
        router: Router,
        network: Arc<dyn Network>,
    ) -> Result<Self, TransportError> {
        let location = environment.location.clone();
        let script_url = resolve(&location, &config.script_url)?;

        let mode = match config.mode {
            Some(mode) => mode,
            None if environment.supports_interception() => Mode::Modern,
            None => {
                warn!("Switching to legacy mode");
                Mode::Legacy
            }
        };

        let policy = config.on_handler_failure;
        let transport: Arc<dyn Transport> = match mode {
            Mode::Modern => Arc::new(ModernTransport::install(
                script_url, &location, router, network, policy,
            )?),
            Mode::Legacy => Arc::new(LegacyTransport::open(
                &script_url,
                &location,
                router,
                network,
                policy,
                config.reply_timeout(),
            )?),
        };
        info!("Mocker client ready in {} mode", mode);

        Ok(Self {
            transport,
            location,
        })
    }

    pub fn mode(&self) -> Mode {
        self.transport.mode()
    }

    /// Resolve `url` against the page location.
    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        resolve(&self.location, url)
    }

    /// Build a request for `url`, relative to the page location.
    pub fn request(&self, method: HttpMethod, url: &str) -> Result<NativeRequest, TransportError> {
        Ok(NativeRequest::new(method, self.resolve(url)?))
    }

    pub async fn fetch(&self, request: NativeRequest) -> Result<NativeResponse, TransportError> {
        self.transport.fetch(request).await
    }
}

fn resolve(base: &Url, url: &str) -> Result<Url, TransportError> {
    base.join(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
