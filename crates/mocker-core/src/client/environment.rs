//! The page context a client is created in.

use tracing::warn;
use url::Url;

const SECURE_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Page location and interception capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub location: Url,
    /// Whether the page can install an interception worker
    pub service_worker: bool,
}

impl Environment {
    /// Environment with worker support at `location`.
    pub fn new(location: Url) -> Self {
        Self {
            location,
            service_worker: true,
        }
    }

    pub fn without_service_worker(mut self) -> Self {
        self.service_worker = false;
        self
    }

    /// `https:` pages and loopback hosts.
    pub fn is_secure_context(&self) -> bool {
        self.location.scheme() == "https"
            || self
                .location
                .host_str()
                .is_some_and(|host| SECURE_HOSTS.contains(&host))
    }

    /// Whether the modern transport can be used here; logs why not.
    pub fn supports_interception(&self) -> bool {
        if !self.service_worker {
            warn!(
                "Service worker is not supported in this environment, \
                 see http://caniuse.com/#feat=serviceworkers"
            );
            return false;
        }

        if !self.is_secure_context() {
            warn!(
                "Service workers should be registered in secure pages ({} is not), \
                 see https://github.com/w3c/ServiceWorker/blob/master/explainer.md#getting-started",
                self.location.origin().ascii_serialization()
            );
            return false;
        }

        true
    }
}
