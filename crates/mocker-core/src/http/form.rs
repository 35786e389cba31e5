//! Form bodies: `application/x-www-form-urlencoded` and `multipart/form-data`.

use crate::http::body::{Blob, BodyError};
use bytes::{BufMut, Bytes, BytesMut};
use futures::{future, stream};
use url::form_urlencoded;

pub const URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART: &str = "multipart/form-data";

/// Form field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File { filename: String, blob: Blob },
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            FormValue::File { .. } => None,
        }
    }
}

/// Ordered form entries; names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), FormValue::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, filename: impl Into<String>, blob: Blob) {
        self.entries.push((
            name.into(),
            FormValue::File {
                filename: filename.into(),
                blob,
            },
        ));
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(String, FormValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a body according to its content type.
    pub fn parse(content_type: &str, body: &[u8]) -> Result<Self, BodyError> {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        if mime.eq_ignore_ascii_case(URLENCODED) {
            Ok(Self::parse_urlencoded(body))
        } else if mime.eq_ignore_ascii_case(MULTIPART) {
            let boundary = multer::parse_boundary(content_type)
                .map_err(|e| BodyError::FormData(format!("invalid multipart boundary: {e}")))?;
            futures::executor::block_on(Self::parse_multipart(boundary, body))
        } else {
            Err(BodyError::FormData(format!(
                "unsupported content type '{content_type}'"
            )))
        }
    }

    pub fn parse_urlencoded(input: &[u8]) -> Self {
        let mut form = FormData::new();
        for (name, value) in form_urlencoded::parse(input) {
            form.append(name, value);
        }
        form
    }

    async fn parse_multipart(boundary: String, body: &[u8]) -> Result<Self, BodyError> {
        let malformed = |e: multer::Error| BodyError::FormData(format!("malformed multipart body: {e}"));
        let stream = stream::once(future::ready(Ok::<_, std::io::Error>(
            Bytes::copy_from_slice(body),
        )));
        let mut multipart = multer::Multipart::new(stream, boundary);
        let mut form = FormData::new();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field
                .name()
                .map(str::to_string)
                .ok_or_else(|| BodyError::FormData("multipart part without a name".to_string()))?;
            let filename = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_default();
            let content = field.bytes().await.map_err(malformed)?;

            match filename {
                Some(filename) => form.append_file(name, filename, Blob::new(content, content_type)),
                None => form.append(name, String::from_utf8_lossy(&content)),
            }
        }

        Ok(form)
    }

    /// Text fields as `a=1&b=2`. File fields are sent as their file name.
    pub fn to_urlencoded(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.entries {
            let value = match value {
                FormValue::Text(s) => s.as_str(),
                FormValue::File { filename, .. } => filename.as_str(),
            };
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    pub fn to_multipart(&self, boundary: &str) -> Bytes {
        let mut out = BytesMut::new();
        for (name, value) in &self.entries {
            out.put_slice(format!("--{boundary}\r\n").as_bytes());
            let name = quote_param(name);
            match value {
                FormValue::Text(text) => {
                    out.put_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    out.put_slice(text.as_bytes());
                }
                FormValue::File { filename, blob } => {
                    out.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                            quote_param(filename)
                        )
                        .as_bytes(),
                    );
                    if !blob.content_type().is_empty() {
                        out.put_slice(format!("Content-Type: {}\r\n", blob.content_type()).as_bytes());
                    }
                    out.put_slice(b"\r\n");
                    out.put_slice(blob.bytes());
                }
            }
            out.put_slice(b"\r\n");
        }
        out.put_slice(format!("--{boundary}--\r\n").as_bytes());
        out.freeze()
    }
}

/// Percent-escape the characters that would end a quoted disposition parameter.
fn quote_param(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
