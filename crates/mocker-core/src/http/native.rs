//! Platform request/response objects that mock requests and responses wrap.

use crate::http::body::{Blob, Body, ReadBody};
use crate::http::form::{FormData, MULTIPART, URLENCODED};
use crate::types::headers::Headers;
use crate::types::method::HttpMethod;
use serde::Serialize;
use url::Url;

/// Outgoing request as issued by page code.
#[derive(Debug, Clone)]
pub struct NativeRequest {
    method: HttpMethod,
    url: Url,
    headers: Headers,
    body: Body,
}

impl NativeRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: Body::empty(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Text body; sets `content-type` unless one is present.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_default_type("text/plain;charset=UTF-8")
            .with_body(text.into())
    }

    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_default_type("application/json").with_body(body))
    }

    pub fn with_blob(self, blob: Blob) -> Self {
        let request = if blob.content_type().is_empty() {
            self
        } else {
            let content_type = blob.content_type().to_string();
            self.with_default_type(&content_type)
        };
        request.with_body(blob.into_bytes())
    }

    pub fn with_urlencoded(self, form: &FormData) -> Self {
        self.with_header("content-type", URLENCODED)
            .with_body(form.to_urlencoded())
    }

    pub fn with_multipart(self, form: &FormData, boundary: &str) -> Self {
        self.with_header("content-type", format!("{MULTIPART}; boundary={boundary}"))
            .with_body(form.to_multipart(boundary))
    }

    fn with_default_type(mut self, content_type: &str) -> Self {
        if !self.headers.contains("content-type") {
            self.headers.set("content-type", content_type);
        }
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}

impl ReadBody for NativeRequest {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn body_content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }
}

/// Response handed back to the page.
#[derive(Debug, Clone)]
pub struct NativeResponse {
    status: u16,
    headers: Headers,
    body: Body,
}

impl NativeResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
        }
    }

    pub fn from_parts(status: u16, headers: Headers, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl ReadBody for NativeResponse {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn body_content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::form::FormValue;
    use rstest::rstest;
    use serde_json::json;

    fn url() -> Url {
        Url::parse("http://localhost:3000/upload").expect("valid url")
    }

    #[rstest]
    fn test_request_json_body() {
        let mut request = NativeRequest::new(HttpMethod::Post, url())
            .with_json(&json!({"user": "dolphin"}))
            .expect("Should serialize");
        assert_eq!(request.headers().content_type(), Some("application/json"));
        let value: serde_json::Value = request.json().expect("Should parse");
        assert_eq!(value, json!({"user": "dolphin"}));
    }

    #[rstest]
    fn test_request_text_keeps_explicit_content_type() {
        let mut request = NativeRequest::new(HttpMethod::Post, url())
            .with_header("Content-Type", "text/csv")
            .with_text("a,b");
        assert_eq!(request.headers().content_type(), Some("text/csv"));
        assert_eq!(request.text().expect("Should read"), "a,b");
    }

    #[rstest]
    fn test_request_blob_body() {
        let mut request = NativeRequest::new(HttpMethod::Post, url())
            .with_blob(Blob::new(vec![1u8, 2, 3], "application/octet-stream"));
        let blob = request.blob().expect("Should read");
        assert_eq!(blob.bytes().as_ref(), &[1u8, 2, 3]);
        assert_eq!(blob.content_type(), "application/octet-stream");
    }

    #[rstest]
    #[case::urlencoded(false)]
    #[case::multipart(true)]
    fn test_request_form_body(#[case] multipart: bool) {
        let mut form = FormData::new();
        form.append("user", "dolphin");
        let request = NativeRequest::new(HttpMethod::Post, url());
        let mut request = if multipart {
            request.with_multipart(&form, "----mocker")
        } else {
            request.with_urlencoded(&form)
        };
        let parsed = request.form_data().expect("Should parse");
        assert_eq!(parsed.get("user"), Some(&FormValue::Text("dolphin".to_string())));
    }

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(301, false)]
    #[case(404, false)]
    fn test_response_ok(#[case] status: u16, #[case] ok: bool) {
        assert_eq!(NativeResponse::new(status).ok(), ok);
    }
}
