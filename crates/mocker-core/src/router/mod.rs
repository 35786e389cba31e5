//! Route registration and first-match dispatch.
//!
//! - [`Router`]: shared, ordered route table with base-path scoping
//! - [`MockRequest`] / [`MockResponse`]: what handlers receive
//! - [`Dispatch`]: outcome of routing one native request

mod fixture;
mod handler;
mod request;
mod response;
mod route;
mod scope;

pub use handler::{Handler, HandlerFailure, HandlerFuture};
pub use request::MockRequest;
pub use response::{MockResponse, ResponseError};
pub use route::Route;
pub use scope::BaseScope;

use crate::http::{NativeRequest, NativeResponse};
use crate::matching::{CompiledPattern, PatternError};
use crate::types::method::HttpMethod;
use futures::FutureExt;
use handler::panic_message;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

/// Result of routing a request.
#[derive(Debug)]
pub enum Dispatch {
    /// A handler ended its response
    Responded(NativeResponse),
    /// No route matched; the request is returned untouched
    Unhandled(NativeRequest),
}

/// Route table handle.
///
/// Clones and [`Router::base`] views share the same table. A view only
/// changes the prefix applied to patterns registered through it.
#[derive(Clone)]
pub struct Router {
    routes: Arc<RwLock<Vec<Arc<Route>>>>,
    origin: Url,
    base: String,
}

impl Router {
    /// Create an empty router; relative bases resolve against `origin`.
    pub fn new(origin: Url) -> Self {
        Self {
            routes: Arc::new(RwLock::new(Vec::new())),
            origin,
            base: String::new(),
        }
    }

    /// View whose registrations are prefixed with `prefix`. Nested calls
    /// concatenate.
    pub fn base(&self, prefix: &str) -> Router {
        Router {
            routes: Arc::clone(&self.routes),
            origin: self.origin.clone(),
            base: format!("{}{}", self.base, prefix),
        }
    }

    /// Accumulated base prefix of this view, empty for the root router.
    pub fn base_path(&self) -> &str {
        &self.base
    }

    /// Page location that relative bases resolve against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Number of registered routes, shared by every view of the table.
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Register a handler. `method: None` matches every method.
    ///
    /// `pattern` must start with `/` or be `*`; it is matched against the
    /// request path after this view's base is stripped.
    pub fn route<F, Fut>(
        &self,
        method: Option<HttpMethod>,
        pattern: &str,
        handler: F,
    ) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let route = Route {
            method,
            pattern: CompiledPattern::compile(pattern)?,
            scope: BaseScope::resolve(&self.base, &self.origin)?,
            handler: Arc::new(handler),
        };
        debug!("Registered route {}", route);
        self.routes.write().push(Arc::new(route));
        Ok(self)
    }

    /// Register a handler for `GET` requests matching `pattern`.
    pub fn get<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Get), pattern, handler)
    }

    /// Register a handler for `POST` requests matching `pattern`.
    pub fn post<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Post), pattern, handler)
    }

    /// Register a handler for `PUT` requests matching `pattern`.
    pub fn put<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Put), pattern, handler)
    }

    /// Register a handler for `PATCH` requests matching `pattern`.
    pub fn patch<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Patch), pattern, handler)
    }

    /// Register a handler for `DELETE` requests matching `pattern`.
    pub fn delete<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Delete), pattern, handler)
    }

    /// Register a handler for `HEAD` requests matching `pattern`.
    pub fn head<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Head), pattern, handler)
    }

    /// Register a handler for `OPTIONS` requests matching `pattern`.
    pub fn options<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(Some(HttpMethod::Options), pattern, handler)
    }

    /// Catch-all: any method.
    pub fn all<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, PatternError>
    where
        F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(None, pattern, handler)
    }

    /// Route a request to the first matching handler.
    ///
    /// Waits for the handler to complete and then for its response. A
    /// response ended before the handler failed is still delivered.
    pub async fn dispatch(&self, request: NativeRequest) -> Result<Dispatch, HandlerFailure> {
        let selected = {
            let routes = self.routes.read();
            routes
                .iter()
                .find_map(|route| route.select(&request).map(|m| (Arc::clone(route), m)))
        };

        let Some((route, (path, params))) = selected else {
            debug!("No route for {} {}", request.method(), request.url());
            return Ok(Dispatch::Unhandled(request));
        };

        debug!("{} {} matched {}", request.method(), request.url(), route);

        let mock_request = MockRequest::new(request, &route.scope, path, params);
        let (sender, mut receiver) = oneshot::channel();
        let mock_response = MockResponse::new(sender);

        let handler = Arc::clone(&route.handler);
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            handler.call(mock_request, mock_response)
        })) {
            Ok(future) => AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(panic_message),
            Err(payload) => Err(panic_message(payload)),
        };

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(HandlerFailure::Failed {
                route: route.to_string(),
                reason: format!("{err:#}"),
            }),
            Err(message) => Some(HandlerFailure::Panicked {
                route: route.to_string(),
                message,
            }),
        };

        match failure {
            None => receiver
                .await
                .map(Dispatch::Responded)
                .map_err(|_| HandlerFailure::NoResponse {
                    route: route.to_string(),
                }),
            Some(failure) => match receiver.try_recv() {
                Ok(response) => {
                    warn!("{} after the response was sent", failure);
                    Ok(Dispatch::Responded(response))
                }
                Err(_) => Err(failure),
            },
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("origin", &self.origin.as_str())
            .field("base", &self.base)
            .field("routes", &*self.routes.read())
            .finish()
    }
}
