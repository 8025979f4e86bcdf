use media_collection::QueryKey;
use media_model::{ItemId, SiteId};
use std::collections::HashSet;

/// What an in-flight fetch is for: a single item or a query page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Item(ItemId),
    Page(QueryKey),
}

/// Correlation key for one logical remote fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub site_id: SiteId,
    pub target: FetchTarget,
}

impl FetchKey {
    pub fn item(site_id: SiteId, id: ItemId) -> Self {
        Self {
            site_id,
            target: FetchTarget::Item(id),
        }
    }

    pub fn page(site_id: SiteId, key: QueryKey) -> Self {
        Self {
            site_id,
            target: FetchTarget::Page(key),
        }
    }
}

/// In-flight fetch bookkeeping.
///
/// An entry is created when a fetch starts and removed unconditionally when
/// it settles, success or failure. A duplicate `begin` while an entry exists
/// is the signal to skip the fetch entirely; the skip is silent, not an
/// error.
#[derive(Debug, Default)]
pub struct FetchGuard {
    in_flight: HashSet<FetchKey>,
}

impl FetchGuard {
    /// Returns `false` when an identical fetch is already in flight.
    pub fn begin(&mut self, key: FetchKey) -> bool {
        self.in_flight.insert(key)
    }

    pub fn finish(&mut self, key: &FetchKey) {
        self.in_flight.remove(key);
    }

    pub fn is_in_flight(&self, key: &FetchKey) -> bool {
        self.in_flight.contains(key)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_begin_is_rejected_until_finished() {
        let mut guard = FetchGuard::default();
        let key = FetchKey::item(1, ItemId::from(7));

        assert_eq!(guard.begin(key.clone()), true);
        assert_eq!(guard.begin(key.clone()), false);

        guard.finish(&key);
        assert_eq!(guard.begin(key), true);
    }

    #[test]
    fn item_and_page_targets_are_independent() {
        let mut guard = FetchGuard::default();
        let item = FetchKey::item(1, ItemId::from(7));
        let page = FetchKey::page(1, media_collection::canonicalize(&Default::default()));

        assert_eq!(guard.begin(item), true);
        assert_eq!(guard.begin(page), true);
        assert_eq!(guard.len(), 2);
    }
}
