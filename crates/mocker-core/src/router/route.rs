//! Registered route entries.

use crate::http::NativeRequest;
use crate::matching::{CompiledPattern, Params};
use crate::router::handler::Handler;
use crate::router::scope::BaseScope;
use crate::types::method::HttpMethod;
use std::fmt;
use std::sync::Arc;

/// Route table entry. Immutable once registered.
pub struct Route {
    /// HTTP method; `None` matches any method
    pub(crate) method: Option<HttpMethod>,
    pub(crate) pattern: CompiledPattern,
    pub(crate) scope: BaseScope,
    pub(crate) handler: Arc<dyn Handler>,
}

impl Route {
    /// Route-relative path and parameters if this route accepts the request.
    pub(crate) fn select(&self, request: &NativeRequest) -> Option<(String, Params)> {
        if let Some(method) = self.method {
            if method != request.method() {
                return None;
            }
        }

        let path = self.scope.strip(request.url())?;
        let params = self.pattern.matches(&path)?;
        Some((path, params))
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn base_url(&self) -> String {
        self.scope.base_url()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Some(method) => write!(f, "{} {}{}", method, self.scope.base_url(), self.pattern.as_str()),
            None => write!(f, "* {}{}", self.scope.base_url(), self.pattern.as_str()),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("base_url", &self.scope.base_url())
            .finish_non_exhaustive()
    }
}
