use crate::fetch_guard::{FetchGuard, FetchKey};
use media_collection::CollectionIndex;
use media_model::{ItemId, MediaItem, MediaQuery, SiteId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cache mutation, applied as one atomic state transition.
#[derive(Debug, Clone)]
pub enum CacheOp {
    Upsert(Vec<MediaItem>),
    Remove(Vec<ItemId>),
    /// Supersede the item under `old_id` with `item`, in place in every
    /// window. Used when a transient placeholder resolves to its persisted
    /// form.
    Replace {
        old_id: ItemId,
        item: MediaItem,
    },
    SetWindow {
        query: MediaQuery,
        ids: Vec<ItemId>,
        found: Option<u64>,
    },
    SetRequesting {
        query: MediaQuery,
        requesting: bool,
    },
    Resort {
        query: MediaQuery,
    },
}

/// Snapshot answer to a collection query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub items: Vec<MediaItem>,
    pub found: Option<u64>,
    pub requesting: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    sites: HashMap<SiteId, Arc<CollectionIndex>>,
    guard: FetchGuard,
}

/// Cloneable handle to the cache state.
///
/// The store exclusively owns every [`CollectionIndex`]; reads hand out
/// immutable `Arc` snapshots and cloned items. The internal lock is held
/// only for the duration of one state transition and never across an await
/// point.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    inner: Arc<Mutex<StoreState>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, site_id: SiteId, id: &ItemId) -> Option<MediaItem> {
        let state = self.state();
        state.sites.get(&site_id)?.get(id).cloned()
    }

    /// Current snapshot of a site's index, if the site has one.
    pub fn site_index(&self, site_id: SiteId) -> Option<Arc<CollectionIndex>> {
        self.state().sites.get(&site_id).cloned()
    }

    /// Resolve a query against the cache. A site with no index yields an
    /// empty, non-requesting result without allocating a site slot.
    pub fn query(&self, site_id: SiteId, query: &MediaQuery) -> QueryResult {
        let index = match self.site_index(site_id) {
            Some(index) => index,
            None => return QueryResult::default(),
        };
        let (found, requesting) = index
            .window(query)
            .map(|window| (window.found, window.requesting))
            .unwrap_or((None, false));
        QueryResult {
            items: index.window_items(query),
            found,
            requesting,
        }
    }

    /// Apply one mutation to a site's index, lazily creating the index on
    /// the first effective mutation. Returns whether the snapshot changed;
    /// an identity-stable no-op leaves the map untouched.
    pub fn apply(&self, site_id: SiteId, op: CacheOp) -> bool {
        let mut state = self.state();
        let base = state
            .sites
            .get(&site_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(CollectionIndex::default()));

        let next = match op {
            CacheOp::Upsert(items) => base.upsert(&items),
            CacheOp::Remove(ids) => base.remove(&ids),
            CacheOp::Replace { old_id, item } => base.replace(&old_id, &item),
            CacheOp::SetWindow { query, ids, found } => base.set_window(&query, ids, found),
            CacheOp::SetRequesting { query, requesting } => base.set_requesting(&query, requesting),
            CacheOp::Resort { query } => base.resort(&query),
        };

        if Arc::ptr_eq(&next, &base) {
            return false;
        }
        log::trace!("site {site_id} cache advanced to {} items", next.len());
        state.sites.insert(site_id, next);
        true
    }

    /// Returns `false` when an identical fetch is already in flight.
    pub fn begin_fetch(&self, key: FetchKey) -> bool {
        self.state().guard.begin(key)
    }

    pub fn finish_fetch(&self, key: &FetchKey) {
        self.state().guard.finish(key);
    }

    pub fn is_fetching(&self, key: &FetchKey) -> bool {
        self.state().guard.is_in_flight(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_model::fields;
    use pretty_assertions::assert_eq;

    fn item(id: u64, title: &str) -> MediaItem {
        let mut item = MediaItem::new(ItemId::from(id), 1);
        item.set_field(fields::TITLE, title);
        item.set_field(fields::MIME_TYPE, "image/png");
        item.set_field(fields::DATE_MS, id * 10);
        item
    }

    #[test]
    fn query_on_unknown_site_is_empty_without_allocation() {
        let store = CacheStore::new();
        assert_eq!(store.query(9, &MediaQuery::new()), QueryResult::default());
        assert!(store.site_index(9).is_none());
    }

    #[test]
    fn apply_reports_whether_the_snapshot_changed() {
        let store = CacheStore::new();
        assert_eq!(store.apply(1, CacheOp::Upsert(vec![item(1, "a")])), true);
        // Idempotent upsert: identical item, identical snapshot.
        assert_eq!(store.apply(1, CacheOp::Upsert(vec![item(1, "a")])), false);
        assert_eq!(store.get(1, &ItemId::from(1)).unwrap().title(), Some("a"));
    }

    #[test]
    fn noop_on_unknown_site_does_not_allocate_a_slot() {
        let store = CacheStore::new();
        assert_eq!(store.apply(3, CacheOp::Remove(vec![ItemId::from(1)])), false);
        assert!(store.site_index(3).is_none());
    }

    #[test]
    fn sites_are_isolated() {
        let store = CacheStore::new();
        store.apply(1, CacheOp::Upsert(vec![item(1, "a")]));
        assert_eq!(store.get(2, &ItemId::from(1)), None);
    }

    #[test]
    fn query_reflects_window_state() {
        let store = CacheStore::new();
        let query = MediaQuery::new().with("mime_type", "image/");
        store.apply(1, CacheOp::Upsert(vec![item(1, "a"), item(2, "b")]));
        store.apply(
            1,
            CacheOp::SetWindow {
                query: query.clone(),
                ids: vec![ItemId::from(2), ItemId::from(1)],
                found: Some(7),
            },
        );

        let result = store.query(1, &query);
        assert_eq!(result.found, Some(7));
        assert_eq!(result.requesting, false);
        assert_eq!(
            result.items.iter().map(|i| i.id.clone()).collect::<Vec<_>>(),
            vec![ItemId::from(2), ItemId::from(1)]
        );
    }

    #[test]
    fn fetch_guard_deduplicates_until_finished() {
        let store = CacheStore::new();
        let key = FetchKey::item(1, ItemId::from(7));
        assert_eq!(store.begin_fetch(key.clone()), true);
        assert_eq!(store.begin_fetch(key.clone()), false);
        store.finish_fetch(&key);
        assert_eq!(store.begin_fetch(key), true);
    }
}
