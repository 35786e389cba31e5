//! Route pattern compilation with named path parameters.

use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Path parameters extracted by a successful match.
pub type Params = HashMap<String, String>;

/// Errors raised while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Pattern '{pattern}' must start with '/' or be '*'")]
    RelativePattern { pattern: String },
    #[error("Empty parameter name in pattern '{pattern}'")]
    EmptyParameter { pattern: String },
    #[error("Invalid parameter name ':{name}' in pattern '{pattern}'")]
    InvalidParameter { pattern: String, name: String },
    #[error("Duplicate parameter ':{name}' in pattern '{pattern}'")]
    DuplicateParameter { pattern: String, name: String },
    #[error("Invalid base '{base}': {reason}")]
    InvalidBase { base: String, reason: String },
    #[error("Failed to compile pattern '{pattern}': {reason}")]
    Regex { pattern: String, reason: String },
}

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Segments(Regex),
}

/// Compiled route pattern.
///
/// `:name` segments capture exactly one non-empty path segment, everything
/// else matches literally. `*` (or an empty pattern) matches every path.
/// Any other pattern must start with `/`.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    param_names: Vec<String>,
    matcher: Matcher,
}

impl CompiledPattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self {
                source: pattern.to_string(),
                param_names: Vec::new(),
                matcher: Matcher::Any,
            });
        }

        if !pattern.starts_with('/') {
            return Err(PatternError::RelativePattern {
                pattern: pattern.to_string(),
            });
        }

        let mut param_names = Vec::new();
        let mut seen = HashSet::new();
        let mut parts = Vec::new();

        for segment in pattern.split('/') {
            let Some(name) = segment.strip_prefix(':') else {
                parts.push(regex::escape(segment));
                continue;
            };

            if name.is_empty() {
                return Err(PatternError::EmptyParameter {
                    pattern: pattern.to_string(),
                });
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(PatternError::InvalidParameter {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(PatternError::DuplicateParameter {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }

            param_names.push(name.to_string());
            parts.push("([^/]+)".to_string());
        }

        let regex = Regex::new(&format!("^{}$", parts.join("/"))).map_err(|e| {
            PatternError::Regex {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            source: pattern.to_string(),
            param_names,
            matcher: Matcher::Segments(regex),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in the order they appear in the pattern.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Match a path (no query string), returning decoded parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let regex = match &self.matcher {
            Matcher::Any => return Some(Params::new()),
            Matcher::Segments(regex) => regex,
        };

        let caps = regex.captures(path)?;

        let params = self
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                caps.get(i + 1).map(|m| {
                    let value = urlencoding::decode(m.as_str())
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| m.as_str().to_owned());
                    (name.clone(), value)
                })
            })
            .collect();

        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/api/users", "/api/users", true, &[])]
    #[case("/api/users", "/api/users/", false, &[])]
    #[case("/api/users/", "/api/users/", true, &[])]
    #[case("/:user", "/dolphin", true, &[("user", "dolphin")])]
    #[case("/:user", "/a/b", false, &[])]
    #[case("/:user", "/", false, &[])]
    #[case("/api/users/:id", "/api/users/abc-123", true, &[("id", "abc-123")])]
    #[case("/api/users/:a/posts/:b", "/api/users/1/posts/2", true, &[("a", "1"), ("b", "2")])]
    #[case("/api/users/:a/posts/:b", "/api/users/1/comments/2", false, &[])]
    #[case("/api/users", "/api/posts", false, &[])]
    #[case("/api/users/:id", "/api/users", false, &[])]
    #[case("/api/users/:id", "/api/users/123/extra", false, &[])]
    #[case("/", "/", true, &[])]
    #[case("/api/users.json", "/api/users.json", true, &[])]
    #[case("/api/users.json", "/api/usersXjson", false, &[])]
    #[case("/files/:name", "/files/a%20b", true, &[("name", "a b")])]
    #[case("*", "/anything/at/all", true, &[])]
    #[case("", "/", true, &[])]
    fn test_pattern_matches(
        #[case] pattern: &str,
        #[case] path: &str,
        #[case] expected: bool,
        #[case] params: &[(&str, &str)],
    ) {
        let compiled = CompiledPattern::compile(pattern).expect("Should compile");
        let result = compiled.matches(path);
        assert_eq!(result.is_some(), expected);
        if let Some(result) = result {
            assert_eq!(result.len(), params.len());
            for (k, v) in params {
                assert_eq!(result.get(*k), Some(&(*v).to_owned()));
            }
        }
    }

    #[rstest]
    fn test_pattern_param_names_in_order() {
        let compiled = CompiledPattern::compile("/:org/repos/:repo/:branch").expect("Should compile");
        assert_eq!(compiled.param_names(), &["org", "repo", "branch"]);
        assert_eq!(compiled.as_str(), "/:org/repos/:repo/:branch");
    }

    #[rstest]
    fn test_pattern_duplicate_parameter() {
        let err = CompiledPattern::compile("/:id/items/:id").unwrap_err();
        assert!(matches!(err, PatternError::DuplicateParameter { ref name, .. } if name == "id"));
    }

    #[rstest]
    #[case("/users/:")]
    #[case("/:/x")]
    fn test_pattern_empty_parameter(#[case] pattern: &str) {
        assert!(matches!(
            CompiledPattern::compile(pattern),
            Err(PatternError::EmptyParameter { .. })
        ));
    }

    #[rstest]
    #[case("/users/:id.json")]
    #[case("/users/:na-me")]
    fn test_pattern_invalid_parameter(#[case] pattern: &str) {
        assert!(matches!(
            CompiledPattern::compile(pattern),
            Err(PatternError::InvalidParameter { .. })
        ));
    }

    #[rstest]
    #[case("users")]
    #[case("users/:id")]
    #[case(":id")]
    #[case("**")]
    fn test_pattern_relative_is_rejected(#[case] pattern: &str) {
        assert!(matches!(
            CompiledPattern::compile(pattern),
            Err(PatternError::RelativePattern { .. })
        ));
    }
}
