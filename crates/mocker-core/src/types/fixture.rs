//! Declarative mock routes loaded from config files.

use crate::types::method::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static mock route answered with a fixed response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fixture {
    /// HTTP method; omitted means any method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Route pattern (`/users/:id`, `*`)
    pub path: String,
    /// Base path or remote base URL the pattern is scoped under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// HTTP status code for the response (100-599); other codes fail the route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Response body; strings are sent as text, everything else as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Delay in milliseconds before the response ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}
