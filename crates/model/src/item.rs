use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of the site that owns a media collection.
pub type SiteId = u64;

/// Well-known item field names.
///
/// Items carry an open field map; these are the keys the cache core itself
/// reads or writes. Anything else is passed through untouched.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const FILE: &str = "file";
    pub const URL: &str = "URL";
    pub const GUID: &str = "guid";
    pub const EXTENSION: &str = "extension";
    pub const MIME_TYPE: &str = "mime_type";
    pub const DATE_MS: &str = "date_ms";
    pub const SIZE: &str = "size";
    pub const PARENT_ID: &str = "parent_id";
}

/// Media item identifier.
///
/// Persisted items use the numeric id assigned by the remote service;
/// transient placeholders use a locally generated `"media-N"` string until
/// the upload settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(u64),
    Text(String),
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        ItemId::Number(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        ItemId::Text(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{n}"),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

/// A single media item in a site's collection.
///
/// Exactly one item per `(site_id, id)` lives in a site's index at any time.
/// A transient item is superseded in place by the persisted item once the
/// remote call resolves; it is never duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    pub site_id: SiteId,
    /// Placeholder for an upload that has not persisted yet.
    #[serde(default, skip_serializing_if = "is_false")]
    pub transient: bool,
    /// The last remote operation on this item failed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub failed: bool,
    /// A local file edit is pending; the server echo may lag behind it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub dirty: bool,
    /// Open field map: title, URL, mime type, date, size, and anything the
    /// remote service returns.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl MediaItem {
    pub fn new(id: ItemId, site_id: SiteId) -> Self {
        Self {
            id,
            site_id,
            transient: false,
            failed: false,
            dirty: false,
            fields: Map::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Shallow merge: every given field overwrites the existing one wholesale.
    pub fn merge_fields(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.fields.insert(key, value);
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.field(fields::TITLE).and_then(Value::as_str)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.field(fields::MIME_TYPE).and_then(Value::as_str)
    }

    pub fn url(&self) -> Option<&str> {
        self.field(fields::URL).and_then(Value::as_str)
    }

    pub fn date_ms(&self) -> Option<u64> {
        self.field(fields::DATE_MS).and_then(Value::as_u64)
    }
}
