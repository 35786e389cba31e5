//! Base-path scoping for registered routes.

use crate::matching::PatternError;
use url::Url;

/// Origin + path prefix a route was registered under.
///
/// A base that parses as an absolute URL is a remote scope
/// (`https://a.com/api`), anything else is a path on the local origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseScope {
    origin: String,
    path: String,
    base_url: Url,
}

impl BaseScope {
    pub fn resolve(base: &str, local_origin: &Url) -> Result<Self, PatternError> {
        let invalid = |reason: String| PatternError::InvalidBase {
            base: base.to_string(),
            reason,
        };

        let (origin, path) = match Url::parse(base) {
            Ok(remote) if remote.has_host() => (
                remote.origin().ascii_serialization(),
                remote.path().trim_end_matches('/').to_string(),
            ),
            Ok(other) => return Err(invalid(format!("unsupported scheme '{}'", other.scheme()))),
            Err(_) => {
                let path = base.trim_end_matches('/');
                let path = if path.is_empty() || path.starts_with('/') {
                    path.to_string()
                } else {
                    format!("/{path}")
                };
                (local_origin.origin().ascii_serialization(), path)
            }
        };

        let base_url = Url::parse(&format!("{origin}{path}")).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            origin,
            path,
            base_url,
        })
    }

    /// `origin + path`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}{}", self.origin, self.path)
    }

    /// Strip the scope from a request URL, returning the route-relative path.
    pub fn strip(&self, url: &Url) -> Option<String> {
        if url.origin().ascii_serialization() != self.origin {
            return None;
        }

        let path = url.path();
        if self.path.is_empty() {
            return Some(path.to_string());
        }

        let rest = path.strip_prefix(self.path.as_str())?;
        if rest.is_empty() {
            Some("/".to_string())
        } else if rest.starts_with('/') {
            Some(rest.to_string())
        } else {
            None
        }
    }

    /// Absolute URL for a stripped path, joined onto `base_url` as a reference.
    pub fn resolve_path(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.origin, path))
    }
}
