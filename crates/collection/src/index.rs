use crate::matcher::item_matches;
use crate::query_key::{canonicalize, without_paging, QueryKey};
use crate::window::{PageRequest, QueryResultWindow};
use media_model::{ItemId, MediaItem, MediaQuery};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Per-site collection state: the authoritative item set plus zero or more
/// query result windows referencing those items by id.
///
/// All operations are pure transformations on `Arc<CollectionIndex>`. When
/// an operation would produce a structurally identical state it returns the
/// same `Arc` (`Arc::ptr_eq` holds), so callers can cheaply detect no-ops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionIndex {
    items: BTreeMap<ItemId, MediaItem>,
    windows: HashMap<QueryKey, QueryResultWindow>,
}

impl CollectionIndex {
    pub fn get(&self, id: &ItemId) -> Option<&MediaItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.windows.is_empty()
    }

    pub fn window(&self, query: &MediaQuery) -> Option<&QueryResultWindow> {
        self.windows.get(&canonicalize(query))
    }

    pub fn window_by_key(&self, key: &QueryKey) -> Option<&QueryResultWindow> {
        self.windows.get(key)
    }

    /// Items of a query's window, in window order. Ids with no backing item
    /// are skipped.
    pub fn window_items(&self, query: &MediaQuery) -> Vec<MediaItem> {
        self.window(query)
            .map(|window| {
                window
                    .ids
                    .iter()
                    .filter_map(|id| self.items.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The next unfetched page for a query given its current window. An
    /// absent window means the first page.
    pub fn next_page(&self, query: &MediaQuery, default_page_size: u64) -> PageRequest {
        let size = query.page_size(default_page_size).max(1);
        let fetched = self
            .window(query)
            .map(|window| window.ids.len() as u64)
            .unwrap_or(0);
        PageRequest {
            page: fetched / size + 1,
            size,
        }
    }

    /// Insert new items or replace existing ones by id. Replacement is a
    /// shallow overwrite; windows keep the id at its current position. An
    /// item seen for the first time is additionally inserted, at its
    /// date-sorted position, into every window whose query it matches.
    pub fn upsert(self: &Arc<Self>, items: &[MediaItem]) -> Arc<Self> {
        let unchanged = items
            .iter()
            .all(|item| self.items.get(&item.id) == Some(item));
        if unchanged {
            return Arc::clone(self);
        }

        let mut next = (**self).clone();
        for item in items {
            let is_new = !next.items.contains_key(&item.id);
            next.items.insert(item.id.clone(), item.clone());
            if is_new {
                next.insert_into_matching_windows(&item.id);
            }
        }
        Arc::new(next)
    }

    /// Delete items and prune their ids from every window. A window that
    /// referenced a removed id has its `found` count decremented.
    pub fn remove(self: &Arc<Self>, ids: &[ItemId]) -> Arc<Self> {
        let affects = ids.iter().any(|id| {
            self.items.contains_key(id) || self.windows.values().any(|w| w.ids.contains(id))
        });
        if !affects {
            return Arc::clone(self);
        }

        let mut next = (**self).clone();
        for id in ids {
            next.items.remove(id);
            for window in next.windows.values_mut() {
                if let Some(pos) = window.ids.iter().position(|wid| wid == id) {
                    window.ids.remove(pos);
                    if let Some(found) = window.found.as_mut() {
                        *found = found.saturating_sub(1);
                    }
                }
            }
        }
        Arc::new(next)
    }

    /// Supersede the item under `old_id` with `item`, substituting the id in
    /// place in every window so the entry keeps its position. This is how a
    /// transient placeholder becomes the persisted item without ever being
    /// duplicated.
    pub fn replace(self: &Arc<Self>, old_id: &ItemId, item: &MediaItem) -> Arc<Self> {
        if old_id == &item.id {
            return self.upsert(std::slice::from_ref(item));
        }

        let mut next = (**self).clone();
        next.items.remove(old_id);
        let is_new = !next.items.contains_key(&item.id);
        next.items.insert(item.id.clone(), item.clone());
        for window in next.windows.values_mut() {
            if let Some(pos) = window.ids.iter().position(|wid| wid == old_id) {
                if window.ids.contains(&item.id) {
                    window.ids.remove(pos);
                } else {
                    window.ids[pos] = item.id.clone();
                }
            }
        }
        if is_new && !next.windows.values().any(|w| w.ids.contains(&item.id)) {
            next.insert_into_matching_windows(&item.id);
        }

        if next == **self {
            return Arc::clone(self);
        }
        Arc::new(next)
    }

    /// Replace (or create) the window for a query with a settled state.
    pub fn set_window(
        self: &Arc<Self>,
        query: &MediaQuery,
        ids: Vec<ItemId>,
        found: Option<u64>,
    ) -> Arc<Self> {
        let key = canonicalize(query);
        let window = QueryResultWindow {
            query: without_paging(query),
            ids,
            found,
            requesting: false,
        };
        if self.windows.get(&key) == Some(&window) {
            return Arc::clone(self);
        }

        let mut next = (**self).clone();
        next.windows.insert(key, window);
        Arc::new(next)
    }

    /// Mark whether a fetch is outstanding for a query. Creates an empty
    /// window when flagging an unknown query as requesting; clearing the
    /// flag on an unknown query is a no-op.
    pub fn set_requesting(self: &Arc<Self>, query: &MediaQuery, requesting: bool) -> Arc<Self> {
        let key = canonicalize(query);
        match self.windows.get(&key) {
            Some(window) if window.requesting == requesting => Arc::clone(self),
            None if !requesting => Arc::clone(self),
            _ => {
                let mut next = (**self).clone();
                let window = next
                    .windows
                    .entry(key)
                    .or_insert_with(|| QueryResultWindow::empty(without_paging(query)));
                window.requesting = requesting;
                Arc::new(next)
            }
        }
    }

    /// Re-order an existing window by item date, newest first. Items without
    /// a date sort last; ties break on id for determinism.
    pub fn resort(self: &Arc<Self>, query: &MediaQuery) -> Arc<Self> {
        let key = canonicalize(query);
        if !self.windows.contains_key(&key) {
            return Arc::clone(self);
        }

        let mut next = (**self).clone();
        let CollectionIndex { items, windows } = &mut next;
        if let Some(window) = windows.get_mut(&key) {
            window.ids.sort_by(|a, b| {
                let date_a = items.get(a).and_then(MediaItem::date_ms).unwrap_or(0);
                let date_b = items.get(b).and_then(MediaItem::date_ms).unwrap_or(0);
                date_b.cmp(&date_a).then_with(|| a.cmp(b))
            });
        }

        if next == **self {
            return Arc::clone(self);
        }
        Arc::new(next)
    }

    fn insert_into_matching_windows(&mut self, id: &ItemId) {
        let CollectionIndex { items, windows } = self;
        let Some(item) = items.get(id) else {
            return;
        };
        let date = item.date_ms().unwrap_or(0);
        for window in windows.values_mut() {
            if window.ids.contains(id) || !item_matches(item, &window.query) {
                continue;
            }
            let pos = window
                .ids
                .iter()
                .position(|wid| {
                    let existing = items.get(wid).and_then(MediaItem::date_ms).unwrap_or(0);
                    existing < date
                })
                .unwrap_or(window.ids.len());
            window.ids.insert(pos, id.clone());
            log::trace!("inserted {id} into window {:?} at {pos}", window.query);
        }
    }
}
