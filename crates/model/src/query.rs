use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known query parameter names.
pub mod params {
    /// Case-insensitive title substring filter.
    pub const SEARCH: &str = "search";
    /// Mime type prefix filter, e.g. `"image/"`.
    pub const MIME_TYPE: &str = "mime_type";
    /// External service identifier for override hooks.
    pub const SOURCE: &str = "source";
    /// Page size.
    pub const NUMBER: &str = "number";
    /// 1-based page number.
    pub const PAGE: &str = "page";
}

/// Filter/sort/pagination parameters for a collection request.
///
/// Parameters are an open key/value map; two queries that canonicalize
/// identically address the same cache entry (see the collection crate's
/// query key codec).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaQuery(pub Map<String, Value>);

impl MediaQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// Requested page size, falling back to `default` when unset or zero.
    pub fn page_size(&self, default: u64) -> u64 {
        self.u64_param(params::NUMBER).filter(|n| *n > 0).unwrap_or(default)
    }

    pub fn source(&self) -> Option<&str> {
        self.str_param(params::SOURCE)
    }
}
