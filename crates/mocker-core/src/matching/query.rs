//! Query string parsing with one level of bracketed keys.

use serde::Serialize;
use std::collections::HashMap;

/// Value of a top-level query key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Text(String),
    Map(HashMap<String, String>),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s),
            QueryValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, String>> {
        match self {
            QueryValue::Map(m) => Some(m),
            QueryValue::Text(_) => None,
        }
    }

    /// Leaf lookup inside a nested value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.as_map().and_then(|m| m.get(key)).map(String::as_str)
    }
}

/// Parsed query string.
pub type Query = HashMap<String, QueryValue>;

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|v| v.into_owned())
        .unwrap_or(raw)
}

/// Split `name[inner]` into its parts. Anything else is a flat key.
fn split_nested(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let inner = key[open + 1..].strip_suffix(']')?;
    let outer = &key[..open];
    if outer.is_empty() || inner.is_empty() || inner.contains(['[', ']']) {
        return None;
    }
    Some((outer, inner))
}

/// Parse query string (without the leading `?`) into a nested map.
///
/// Later occurrences of a key overwrite earlier ones; nested keys sharing a
/// top-level name are merged into one map.
pub fn parse_query(query_str: &str) -> Query {
    let mut result = Query::new();

    for pair in query_str.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(raw_key);
        let value = decode(raw_value);

        match split_nested(&key) {
            Some((outer, inner)) => match result.get_mut(outer) {
                Some(QueryValue::Map(map)) => {
                    map.insert(inner.to_string(), value);
                }
                _ => {
                    let map = HashMap::from([(inner.to_string(), value)]);
                    result.insert(outer.to_string(), QueryValue::Map(map));
                }
            },
            None => {
                result.insert(key, QueryValue::Text(value));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn text(pairs: &[(&str, &str)]) -> Query {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), QueryValue::Text((*v).to_string())))
            .collect()
    }

    #[rstest]
    #[case("", &[])]
    #[case("user=dolphin", &[("user", "dolphin")])]
    #[case("page=1&limit=10", &[("page", "1"), ("limit", "10")])]
    #[case("key=value%20with%20spaces", &[("key", "value with spaces")])]
    #[case("key=a+b", &[("key", "a b")])]
    #[case("key%20name=value", &[("key name", "value")])]
    #[case("page=1&page=2", &[("page", "2")])]
    #[case("page=1&&limit=10", &[("page", "1"), ("limit", "10")])]
    #[case("&page=1&limit=10&", &[("page", "1"), ("limit", "10")])]
    #[case("whatever", &[("whatever", "")])]
    #[case("page=&limit=10", &[("page", ""), ("limit", "10")])]
    #[case("expr=a=b", &[("expr", "a=b")])]
    #[case("a[=1", &[("a[", "1")])]
    #[case("a[]=1", &[("a[]", "1")])]
    #[case("a[b][c]=1", &[("a[b][c]", "1")])]
    fn test_parse_query_flat(#[case] query_str: &str, #[case] expected: &[(&str, &str)]) {
        assert_eq!(parse_query(query_str), text(expected));
    }

    #[rstest]
    fn test_parse_query_nested() {
        let query = parse_query("user[name]=dolphin");
        assert_eq!(query["user"].get("name"), Some("dolphin"));
        assert_eq!(query["user"].as_str(), None);
    }

    #[rstest]
    fn test_parse_query_nested_merge_and_overwrite() {
        let query = parse_query("user[name]=dolphin&user[age]=3&user[name]=whale");
        let user = query["user"].as_map().expect("Should be nested");
        assert_eq!(user.len(), 2);
        assert_eq!(user["name"], "whale");
        assert_eq!(user["age"], "3");
    }

    #[rstest]
    #[case("user=flat&user[name]=nested", None, Some("nested"))]
    #[case("user[name]=nested&user=flat", Some("flat"), None)]
    fn test_parse_query_later_occurrence_replaces(
        #[case] query_str: &str,
        #[case] flat: Option<&str>,
        #[case] nested: Option<&str>,
    ) {
        let query = parse_query(query_str);
        assert_eq!(query["user"].as_str(), flat);
        assert_eq!(query["user"].get("name"), nested);
    }

    #[rstest]
    fn test_parse_query_nested_decoding() {
        let query = parse_query("filter%5Bname%5D=a%26b");
        assert_eq!(query["filter"].get("name"), Some("a&b"));
    }

    #[rstest]
    fn test_query_value_serializes_untagged() {
        let query = parse_query("user[name]=dolphin&id=1");
        let json = serde_json::to_value(&query).expect("Should serialize");
        assert_eq!(json, serde_json::json!({"user": {"name": "dolphin"}, "id": "1"}));
    }
}
