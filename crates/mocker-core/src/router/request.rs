//! Request object handed to route handlers.

use crate::http::{Body, NativeRequest, ReadBody};
use crate::matching::{parse_query, Params, Query};
use crate::router::scope::BaseScope;
use crate::types::headers::Headers;
use crate::types::method::HttpMethod;

/// Matched request with routing data derived once at construction.
///
/// Cloning duplicates the wrapped native request, so the clone's body can be
/// read independently of the original's.
#[derive(Debug, Clone)]
pub struct MockRequest {
    native: NativeRequest,
    params: Params,
    query: Query,
    path: String,
    base_url: String,
    url: String,
}

impl MockRequest {
    pub(crate) fn new(native: NativeRequest, scope: &BaseScope, path: String, params: Params) -> Self {
        let query = parse_query(native.url().query().unwrap_or_default());
        let url = scope.resolve_path(&path);
        Self {
            native,
            params,
            query,
            path,
            base_url: scope.base_url(),
            url,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.native.method()
    }

    pub fn headers(&self) -> &Headers {
        self.native.headers()
    }

    /// Path parameters by name.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Request path with the route's base path stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Origin plus the base path the route was registered under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of `path` resolved against `base_url`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The wrapped platform request.
    pub fn native(&self) -> &NativeRequest {
        &self.native
    }
}

impl ReadBody for MockRequest {
    fn body(&self) -> &Body {
        self.native.body()
    }

    fn body_mut(&mut self) -> &mut Body {
        self.native.body_mut()
    }

    fn body_content_type(&self) -> Option<&str> {
        self.native.body_content_type()
    }
}
