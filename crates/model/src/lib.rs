//! # Media Model
//!
//! Shared domain types for the media collection cache: item identifiers,
//! media items with arbitrary field maps, queries, and validation errors.
//!
//! Items carry three flags outside the open field map: `transient` (a
//! placeholder for a not-yet-persisted upload), `failed` (the last remote
//! operation on the item failed), and `dirty` (a local file edit that the
//! server-echoed representation may not yet reflect).

mod item;
mod query;
mod validation;

pub use item::{fields, ItemId, MediaItem, SiteId};
pub use query::{params, MediaQuery};
pub use validation::ValidationError;
