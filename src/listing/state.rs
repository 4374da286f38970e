//! Per-list accumulation state for "load more" lists.
//!
//! A list moves `Idle -> Loading -> Idle`. `begin_load_more` is only legal from `Idle` while
//! more items remain; `begin_refresh` restarts from offset 0 and supersedes whatever is in
//! flight. Every load carries the generation it was issued under and results from an older
//! generation are dropped, so pages apply in issue order.

use std::collections::HashSet;

use super::{ListFilter, ListPage, ListQuery, LoadError, SortOrder};
use crate::models::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading { generation: u64 },
}

/// Permission to run one fetch. Hand it back to [`ListState::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub query: ListQuery,
    append: bool,
}

/// What happened to a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Not started: already loading or nothing left to load
    Skipped,
    /// Merged; `added` counts ids not seen before
    Applied { added: usize },
    /// Failed; previous items kept and an error message set
    Failed,
    /// Superseded by a newer load and discarded
    Stale,
}

/// Accumulated items of one list under one filter.
#[derive(Debug, Clone)]
pub struct ListState {
    items: Vec<Post>,
    seen: HashSet<String>,
    total: usize,
    status: ListStatus,
    error_message: Option<String>,
    page_size: usize,
    sort: SortOrder,
    filter: ListFilter,
    generation: u64,
}

impl ListState {
    /// An empty list. Call [`ListState::begin_refresh`] to load its first page.
    pub fn new(page_size: usize, sort: SortOrder, filter: ListFilter) -> Self {
        // ListQuery owns the clamping rule
        let page_size = ListQuery::new(0, page_size, sort, ListFilter::default()).limit;
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            total: 0,
            status: ListStatus::Idle,
            error_message: None,
            page_size,
            sort,
            filter,
            generation: 0,
        }
    }

    /// A list hydrated with a server-rendered first page.
    pub fn from_initial(page: ListPage, sort: SortOrder, filter: ListFilter) -> Self {
        let mut state = Self::new(page.limit, sort, filter);
        state.merge(page.items);
        state.total = page.total;
        state
    }

    pub fn items(&self) -> &[Post] {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn status(&self) -> ListStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, ListStatus::Loading { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    pub fn has_more(&self) -> bool {
        self.items.len() < self.total
    }

    fn query_at(&self, offset: usize) -> ListQuery {
        ListQuery::new(offset, self.page_size, self.sort, self.filter.clone())
    }

    /// Start loading the next page. `None` while a load is in flight or when nothing is left.
    pub fn begin_load_more(&mut self) -> Option<LoadTicket> {
        if self.is_loading() || !self.has_more() {
            return None;
        }

        self.generation += 1;
        self.status = ListStatus::Loading {
            generation: self.generation,
        };
        Some(LoadTicket {
            generation: self.generation,
            query: self.query_at(self.items.len()),
            append: true,
        })
    }

    /// Start loading from offset 0, superseding any load in flight.
    pub fn begin_refresh(&mut self) -> LoadTicket {
        self.generation += 1;
        self.status = ListStatus::Loading {
            generation: self.generation,
        };
        LoadTicket {
            generation: self.generation,
            query: self.query_at(0),
            append: false,
        }
    }

    /// Apply the result of a load started with `ticket`.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<ListPage, LoadError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                "Discarding superseded list page (generation {}, current {})",
                ticket.generation,
                self.generation
            );
            return LoadOutcome::Stale;
        }

        self.status = ListStatus::Idle;
        match result {
            Ok(page) => {
                if !ticket.append {
                    self.items.clear();
                    self.seen.clear();
                }
                let added = self.merge(page.items);
                self.total = page.total;
                self.error_message = None;
                LoadOutcome::Applied { added }
            }
            Err(err) => {
                tracing::warn!("List load failed: {}", err);
                self.error_message = Some(err.to_string());
                LoadOutcome::Failed
            }
        }
    }

    /// Give up on a load that will never complete. Back to `Idle` if `generation` is still
    /// the one in flight; items, total and error message are untouched.
    pub fn abandon(&mut self, generation: u64) -> bool {
        if self.status != (ListStatus::Loading { generation }) {
            return false;
        }
        tracing::debug!("Abandoning list load (generation {})", generation);
        self.status = ListStatus::Idle;
        true
    }

    /// Append posts whose id is not already present. Returns how many were added.
    fn merge(&mut self, incoming: Vec<Post>) -> usize {
        let before = self.items.len();
        for post in incoming {
            if self.seen.insert(post.id.clone()) {
                self.items.push(post);
            }
        }
        self.items.len() - before
    }
}
