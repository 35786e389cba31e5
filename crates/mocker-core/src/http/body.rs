//! Single-use request/response bodies.

use crate::http::form::FormData;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Body consumption errors
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Body has already been consumed")]
    AlreadyConsumed,
    #[error("Body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Body is not valid form data: {0}")]
    FormData(String),
}

/// Buffered body that can be read exactly once.
///
/// Cloning duplicates the bytes and the consumption flag, so a clone taken
/// before reading has its own unread copy.
#[derive(Debug, Clone, Default)]
pub struct Body {
    bytes: Bytes,
    used: bool,
}

impl Body {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes without marking the body as used. Transports use this to
    /// serialize a body they own.
    pub(crate) fn peek(&self) -> &Bytes {
        &self.bytes
    }

    pub fn take(&mut self) -> Result<Bytes, BodyError> {
        if self.used {
            return Err(BodyError::AlreadyConsumed);
        }
        self.used = true;
        Ok(std::mem::take(&mut self.bytes))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self { bytes, used: false }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

/// Binary payload with a media type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    content_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Body-consumption operations shared by native and mock requests/responses.
///
/// Every method consumes the body; a second call on the same instance fails
/// with [`BodyError::AlreadyConsumed`].
pub trait ReadBody {
    fn body(&self) -> &Body;

    fn body_mut(&mut self) -> &mut Body;

    fn body_content_type(&self) -> Option<&str>;

    fn body_used(&self) -> bool {
        self.body().is_used()
    }

    fn array_buffer(&mut self) -> Result<Bytes, BodyError> {
        self.body_mut().take()
    }

    fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.body_mut().take()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let bytes = self.body_mut().take()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn blob(&mut self) -> Result<Blob, BodyError> {
        let content_type = self.body_content_type().unwrap_or_default().to_string();
        let bytes = self.body_mut().take()?;
        Ok(Blob::new(bytes, content_type))
    }

    fn form_data(&mut self) -> Result<FormData, BodyError> {
        let content_type = self.body_content_type().unwrap_or_default().to_string();
        let bytes = self.body_mut().take()?;
        FormData::parse(&content_type, &bytes)
    }
}
