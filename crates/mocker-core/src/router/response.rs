//! Response object filled in by route handlers.

use crate::http::{Body, NativeResponse};
use crate::types::headers::Headers;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

/// Response mutation errors
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("Response has already been finalized")]
    AlreadyFinalized,
    #[error("Invalid status code {0}, expected 100-599")]
    InvalidStatus(u16),
    #[error("Failed to serialize JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Response under construction.
///
/// Exactly one terminal call (`end`, `send` or `json`) is allowed; every
/// mutator afterwards fails with [`ResponseError::AlreadyFinalized`].
/// Dropping an unfinished response counts as a handler failure.
#[derive(Debug)]
pub struct MockResponse {
    status: u16,
    headers: Headers,
    body: Body,
    sender: Option<oneshot::Sender<NativeResponse>>,
}

impl MockResponse {
    pub(crate) fn new(sender: oneshot::Sender<NativeResponse>) -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: Body::empty(),
            sender: Some(sender),
        }
    }

    fn ensure_open(&self) -> Result<(), ResponseError> {
        if self.sender.is_none() {
            return Err(ResponseError::AlreadyFinalized);
        }
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.sender.is_none()
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Set the status code; it must lie within 100-599.
    pub fn status(&mut self, status: u16) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        if !(100..=599).contains(&status) {
            return Err(ResponseError::InvalidStatus(status));
        }
        self.status = status;
        Ok(self)
    }

    pub fn header(&mut self, name: &str, value: impl Into<String>) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        self.headers.set(name, value);
        Ok(self)
    }

    pub fn headers_mut(&mut self) -> Result<&mut Headers, ResponseError> {
        self.ensure_open()?;
        Ok(&mut self.headers)
    }

    pub fn body(&mut self, body: impl Into<Body>) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        self.body = body.into();
        Ok(self)
    }

    /// Set the body and end the response.
    pub fn send(&mut self, body: impl Into<Body>) -> Result<(), ResponseError> {
        self.body(body)?;
        self.end()
    }

    /// Serialize `value` as the JSON body and end the response.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ResponseError> {
        self.ensure_open()?;
        let body = serde_json::to_vec(value)?;
        if !self.headers.contains("content-type") {
            self.headers.set("content-type", "application/json");
        }
        self.send(body)
    }

    /// Finalize and hand the response back to the transport.
    pub fn end(&mut self) -> Result<(), ResponseError> {
        let sender = self.sender.take().ok_or(ResponseError::AlreadyFinalized)?;
        let response = NativeResponse::from_parts(
            self.status,
            std::mem::take(&mut self.headers),
            std::mem::take(&mut self.body),
        );
        if sender.send(response).is_err() {
            debug!("Response ended after its request was abandoned");
        }
        Ok(())
    }
}
