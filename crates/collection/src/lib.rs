//! # Media Collection
//!
//! Per-site ordered media collections with query-keyed result windows.
//!
//! ## Pipeline
//!
//! ```text
//! MediaQuery
//!     │
//!     ├──> Query key codec (canonical, paging-free)
//!     │      └─> QueryKey
//!     │
//!     └──> CollectionIndex (pure transformations)
//!            ├─> authoritative item set
//!            └─> QueryResultWindow per key
//! ```
//!
//! Every index operation returns a new `Arc<CollectionIndex>`; an operation
//! that would not change the structure returns the *same* `Arc`, so callers
//! can detect no-ops with `Arc::ptr_eq`.

mod index;
mod matcher;
mod query_key;
mod window;

pub use index::CollectionIndex;
pub use matcher::item_matches;
pub use query_key::{canonicalize, without_paging, QueryKey};
pub use window::{PageRequest, QueryResultWindow};
