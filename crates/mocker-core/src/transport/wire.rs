//! Cross-context message format used by the legacy transport.

use crate::http::{Body, NativeRequest, NativeResponse, ReadBody};
use crate::transport::TransportError;
use crate::types::headers::Headers;
use crate::types::method::HttpMethod;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Body in a message: UTF-8 text as-is, anything else base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WireBody {
    Text(String),
    Binary(String),
}

impl WireBody {
    /// `None` for an empty body.
    pub fn encode(bytes: &Bytes) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Some(match std::str::from_utf8(bytes) {
            Ok(text) => WireBody::Text(text.to_string()),
            Err(_) => WireBody::Binary(STANDARD.encode(bytes)),
        })
    }

    pub fn decode(self) -> Result<Bytes, TransportError> {
        match self {
            WireBody::Text(text) => Ok(Bytes::from(text)),
            WireBody::Binary(data) => STANDARD
                .decode(data)
                .map(Bytes::from)
                .map_err(|e| TransportError::Wire(serde::de::Error::custom(e))),
        }
    }
}

fn decode_body(body: Option<WireBody>) -> Result<Body, TransportError> {
    match body {
        Some(body) => Ok(body.decode()?.into()),
        None => Ok(Body::empty()),
    }
}

/// Page → controller frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub correlation_id: u64,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<WireBody>,
}

impl RequestEnvelope {
    pub fn from_request(correlation_id: u64, request: &NativeRequest) -> Self {
        Self {
            correlation_id,
            method: request.method(),
            url: request.url().to_string(),
            headers: request.headers().clone(),
            body: WireBody::encode(request.body().peek()),
        }
    }

    pub fn into_request(self) -> Result<NativeRequest, TransportError> {
        let url = Url::parse(&self.url).map_err(|e| TransportError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        let mut request = NativeRequest::new(self.method, url).with_body(decode_body(self.body)?);
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Controller frame → page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub correlation_id: u64,
    pub status: u16,
    pub headers: Headers,
    pub body: Option<WireBody>,
    /// Nothing handled the request; the page sends it to the network
    #[serde(default, skip_serializing_if = "is_false")]
    pub pass_through: bool,
}

impl ResponseEnvelope {
    pub fn from_response(correlation_id: u64, response: &NativeResponse) -> Self {
        Self {
            correlation_id,
            status: response.status(),
            headers: response.headers().clone(),
            body: WireBody::encode(response.body().peek()),
            pass_through: false,
        }
    }

    pub fn pass_through(correlation_id: u64) -> Self {
        Self {
            correlation_id,
            status: 0,
            headers: Headers::new(),
            body: None,
            pass_through: true,
        }
    }

    pub fn into_response(self) -> Result<NativeResponse, TransportError> {
        Ok(NativeResponse::from_parts(
            self.status,
            self.headers,
            decode_body(self.body)?,
        ))
    }
}
