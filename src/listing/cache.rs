//! Independent list states per filter, with least-recently-selected eviction.
//!
//! Switching filters never mutates another filter's state; each filter key owns its own
//! pagination and counts.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Mutex;

use super::{ListFilter, ListSession, PageSource, SortOrder};

/// Filter keys remembered before the least recently selected one is dropped.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Identity of one filtered view of a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey {
    pub filter: ListFilter,
    pub sort: SortOrder,
}

impl FilterKey {
    pub fn new(filter: ListFilter, sort: SortOrder) -> Self {
        Self { filter, sort }
    }
}

/// Bounded map keyed by filter; iteration order is selection recency, oldest first.
#[derive(Debug)]
pub struct ListStateCache<V> {
    capacity: usize,
    entries: IndexMap<FilterKey, V>,
}

impl<V> ListStateCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &FilterKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Select `key`, creating its value when absent, and mark it most recently used.
    pub fn get_or_insert_with(&mut self, key: FilterKey, make: impl FnOnce() -> V) -> &mut V {
        let value = match self.entries.shift_remove(&key) {
            Some(value) => value,
            None => {
                while self.entries.len() >= self.capacity {
                    if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                        tracing::debug!("Evicting list state for {:?}", evicted);
                    }
                }
                make()
            }
        };
        let (index, _) = self.entries.insert_full(key, value);
        &mut self.entries[index]
    }

    pub fn remove(&mut self, key: &FilterKey) -> Option<V> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// One list whose filter can be switched, holding a separate session per filter.
pub struct FilteredLists {
    source: Arc<dyn PageSource>,
    page_size: usize,
    sessions: Mutex<ListStateCache<Arc<ListSession>>>,
}

impl FilteredLists {
    pub fn new(source: Arc<dyn PageSource>, page_size: usize, capacity: usize) -> Self {
        Self {
            source,
            page_size,
            sessions: Mutex::new(ListStateCache::new(capacity)),
        }
    }

    /// The session for a filter. A new one is created (and must be refreshed) on first use.
    pub async fn select(&self, filter: ListFilter, sort: SortOrder) -> (Arc<ListSession>, bool) {
        let mut sessions = self.sessions.lock().await;
        let mut created = false;
        let session = sessions.get_or_insert_with(FilterKey::new(filter.clone(), sort), || {
            created = true;
            Arc::new(ListSession::empty(
                self.source.clone(),
                self.page_size,
                sort,
                filter,
            ))
        });
        (session.clone(), created)
    }

    /// Select a filter and make sure its first page is loaded.
    pub async fn open(&self, filter: ListFilter, sort: SortOrder) -> Arc<ListSession> {
        let (session, created) = self.select(filter, sort).await;
        if created {
            session.refresh().await;
        }
        session
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
