//! Route handlers and their failure modes.

use crate::router::request::MockRequest;
use crate::router::response::MockResponse;
use futures::future::BoxFuture;
use std::any::Any;
use std::future::Future;

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Request handler invoked with the matched request and a fresh response.
///
/// The handler finishes the response with [`MockResponse::end`] (or
/// `send`/`json`). It may move the response into another task and end it
/// later; dispatch waits for it.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: MockRequest, response: MockResponse) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(MockRequest, MockResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, request: MockRequest, response: MockResponse) -> HandlerFuture {
        Box::pin(self(request, response))
    }
}

/// Handler failed to produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerFailure {
    #[error("Handler for {route} failed: {reason}")]
    Failed { route: String, reason: String },
    #[error("Handler for {route} panicked: {message}")]
    Panicked { route: String, message: String },
    #[error("Handler for {route} dropped the response without ending it")]
    NoResponse { route: String },
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
