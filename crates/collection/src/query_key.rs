use media_model::{params, MediaQuery};
use serde_json::Value;
use std::fmt;

/// Parameters that position a request within a window rather than select the
/// window itself. They are stripped before keying so successive pages of one
/// logical query accumulate into a single window.
const PAGING_PARAMS: &[&str] = &[params::PAGE, params::NUMBER];

/// Canonical cache key for a media query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a query into a stable cache key.
///
/// Keys are sorted lexicographically and values are type-normalized, so two
/// syntactically different queries that describe the same filter produce the
/// same key. Null values are treated as absent. Pure; never fails.
pub fn canonicalize(query: &MediaQuery) -> QueryKey {
    let mut parts: Vec<(String, String)> = query
        .0
        .iter()
        .filter(|(key, value)| !PAGING_PARAMS.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect();
    parts.sort();

    let encoded = parts
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    QueryKey(encoded)
}

/// The query with pagination position removed, as stored on a window.
pub fn without_paging(query: &MediaQuery) -> MediaQuery {
    let mut stripped = query.clone();
    for param in PAGING_PARAMS {
        stripped.0.remove(*param);
    }
    stripped
}

fn normalize_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(normalize_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(map) => {
            let mut entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}:{}", normalize_value(v)))
                .collect();
            entries.sort();
            entries.join(",")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn key_is_independent_of_field_order() {
        let a = MediaQuery::new()
            .with("mime_type", "image/")
            .with("search", "cat");
        let b = MediaQuery::new()
            .with("search", "cat")
            .with("mime_type", "image/");
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn values_are_type_normalized() {
        let typed = MediaQuery::new().with("recent", true).with("limit", 5);
        let stringly = MediaQuery::new().with("recent", "true").with("limit", "5");
        assert_eq!(canonicalize(&typed), canonicalize(&stringly));
    }

    #[test]
    fn null_values_are_absent() {
        let with_null = MediaQuery::new().with("search", "cat").with("source", json!(null));
        let without = MediaQuery::new().with("search", "cat");
        assert_eq!(canonicalize(&with_null), canonicalize(&without));
    }

    #[test]
    fn paging_is_excluded_from_the_key() {
        let first = MediaQuery::new().with("search", "cat").with(params::PAGE, 1);
        let second = MediaQuery::new()
            .with("search", "cat")
            .with(params::PAGE, 2)
            .with(params::NUMBER, 20);
        assert_eq!(canonicalize(&first), canonicalize(&second));
    }

    #[test]
    fn distinct_filters_get_distinct_keys() {
        let images = MediaQuery::new().with("mime_type", "image/");
        let videos = MediaQuery::new().with("mime_type", "video/");
        assert_ne!(canonicalize(&images), canonicalize(&videos));
    }
}
