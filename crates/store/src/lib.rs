//! # Media Store
//!
//! The cache store: a map from site to its [`CollectionIndex`] snapshot,
//! plus the fetch guard that de-duplicates identical in-flight requests.
//!
//! The store is a cheap cloneable handle; every mutation is a single atomic
//! state transition and consumers re-query after each apply to observe the
//! effect. There is no subscription mechanism here; change propagation is
//! the pipeline's collaborator concern.

mod fetch_guard;
mod store;

pub use fetch_guard::{FetchGuard, FetchKey, FetchTarget};
pub use store::{CacheOp, CacheStore, QueryResult};
