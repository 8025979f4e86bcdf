use media_model::{ItemId, MediaQuery};

/// Ordered result window for one canonical query.
///
/// Created on the first request for a query, replaced wholesale on each
/// successful fetch, and never merged with windows of unrelated queries.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultWindow {
    /// The originating query, with pagination position stripped.
    pub query: MediaQuery,
    /// Item ids in window order.
    pub ids: Vec<ItemId>,
    /// Total matches on the remote side; may exceed the window size.
    pub found: Option<u64>,
    /// A fetch for this query is outstanding. Loading indication only.
    pub requesting: bool,
}

impl QueryResultWindow {
    pub(crate) fn empty(query: MediaQuery) -> Self {
        Self {
            query,
            ids: Vec::new(),
            found: None,
            requesting: false,
        }
    }
}

/// The next unfetched page of a query, used to build the remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn first(size: u64) -> Self {
        Self { page: 1, size }
    }
}
