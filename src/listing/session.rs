//! Async driver for a [`ListState`].
//!
//! The state lock is released while a fetch is suspended. A fetch whose generation is
//! superseded by a refresh is abandoned instead of waiting for its response, and a load
//! whose future is dropped mid-fetch puts the list back to idle.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use super::{ListFilter, ListPage, ListState, LoadOutcome, LoadTicket, PageSource, SortOrder};

/// One rendered list bound to a page source.
pub struct ListSession {
    state: Arc<Mutex<ListState>>,
    source: Arc<dyn PageSource>,
    generation: watch::Sender<u64>,
}

impl ListSession {
    pub fn new(source: Arc<dyn PageSource>, state: ListState) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(state)),
            source,
            generation,
        }
    }

    /// A session with no items yet; the first `refresh` loads page one.
    pub fn empty(
        source: Arc<dyn PageSource>,
        page_size: usize,
        sort: SortOrder,
        filter: ListFilter,
    ) -> Self {
        Self::new(source, ListState::new(page_size, sort, filter))
    }

    /// A session hydrated with a first page rendered elsewhere.
    pub fn hydrated(
        source: Arc<dyn PageSource>,
        initial: ListPage,
        sort: SortOrder,
        filter: ListFilter,
    ) -> Self {
        Self::new(source, ListState::from_initial(initial, sort, filter))
    }

    /// Load the next page. A no-op while another load is in flight or nothing is left.
    pub async fn load_more(&self) -> LoadOutcome {
        let ticket = {
            let mut state = self.state.lock().await;
            match state.begin_load_more() {
                Some(ticket) => {
                    self.publish(ticket.generation);
                    ticket
                }
                None => return LoadOutcome::Skipped,
            }
        };
        self.run(ticket).await
    }

    /// Reload from offset 0, superseding any load in flight.
    pub async fn refresh(&self) -> LoadOutcome {
        let ticket = {
            let mut state = self.state.lock().await;
            let ticket = state.begin_refresh();
            self.publish(ticket.generation);
            ticket
        };
        self.run(ticket).await
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> ListState {
        self.state.lock().await.clone()
    }

    /// Generations only move forward.
    fn publish(&self, generation: u64) {
        self.generation.send_if_modified(|current| {
            if *current < generation {
                *current = generation;
                true
            } else {
                false
            }
        });
    }

    async fn run(&self, ticket: LoadTicket) -> LoadOutcome {
        let in_flight = InFlight::new(self.state.clone(), ticket.generation);
        let superseded = wait_superseded(self.generation.subscribe(), ticket.generation);

        let result = tokio::select! {
            result = self.source.fetch_page(&ticket.query) => result,
            _ = superseded => {
                tracing::debug!("Abandoning superseded fetch at offset {}", ticket.query.offset);
                in_flight.disarm();
                return LoadOutcome::Stale;
            }
        };

        let outcome = self.state.lock().await.complete(&ticket, result);
        in_flight.disarm();
        outcome
    }
}

/// Armed while a fetch runs. Dropped armed, it abandons the load so the list can retry.
struct InFlight {
    state: Arc<Mutex<ListState>>,
    generation: u64,
    armed: bool,
}

impl InFlight {
    fn new(state: Arc<Mutex<ListState>>, generation: u64) -> Self {
        Self {
            state,
            generation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let generation = self.generation;
        match self.state.try_lock() {
            Ok(mut state) => {
                state.abandon(generation);
            }
            // someone holds the lock briefly; finish the reset on the runtime
            Err(_) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let state = self.state.clone();
                    handle.spawn(async move {
                        state.lock().await.abandon(generation);
                    });
                }
                Err(_) => tracing::warn!(
                    "List load {} dropped outside a runtime; state left loading",
                    generation
                ),
            },
        }
    }
}

/// Resolves once the published generation differs from `generation`.
async fn wait_superseded(mut rx: watch::Receiver<u64>, generation: u64) {
    loop {
        if *rx.borrow_and_update() != generation {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::listing::testing::{post, GatedSource, MemorySource};
    use crate::listing::{ListQuery, ListStatus};

    fn posts(n: u32) -> Vec<crate::models::Post> {
        (1..=n).map(|i| post(&format!("p{i}"), i)).collect()
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let source = Arc::new(MemorySource::new(posts(5)));
        let session = ListSession::empty(source.clone(), 2, SortOrder::Newest, ListFilter::default());

        assert_eq!(session.refresh().await, LoadOutcome::Applied { added: 2 });
        assert_eq!(session.load_more().await, LoadOutcome::Applied { added: 2 });
        assert_eq!(session.load_more().await, LoadOutcome::Applied { added: 1 });
        assert_eq!(session.load_more().await, LoadOutcome::Skipped);

        let state = session.snapshot().await;
        assert_eq!(state.items().len(), 5);
        assert!(!state.has_more());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_load_more_issues_one_request() {
        let source = Arc::new(GatedSource::new());
        let initial = ListPage::new(vec![post("p1", 1), post("p2", 2)], 4, 0, 2);
        let session = Arc::new(ListSession::hydrated(
            source.clone(),
            initial,
            SortOrder::Newest,
            ListFilter::default(),
        ));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.load_more().await }
        });
        source.wait_for_calls(1).await;

        // first request is outstanding
        assert_eq!(session.load_more().await, LoadOutcome::Skipped);

        source.release(Ok(ListPage::new(vec![post("p3", 3), post("p4", 4)], 4, 2, 2)));
        assert_eq!(first.await.unwrap(), LoadOutcome::Applied { added: 2 });
        assert_eq!(source.calls(), 1);
        assert_eq!(session.snapshot().await.items().len(), 4);
    }

    #[tokio::test]
    async fn test_refresh_abandons_outstanding_load() {
        let source = Arc::new(GatedSource::new());
        let initial = ListPage::new(vec![post("p1", 1), post("p2", 2)], 4, 0, 2);
        let session = Arc::new(ListSession::hydrated(
            source.clone(),
            initial,
            SortOrder::Newest,
            ListFilter::default(),
        ));

        let stale = tokio::spawn({
            let session = session.clone();
            async move { session.load_more().await }
        });
        source.wait_for_calls(1).await;

        let fresh = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });

        assert_eq!(stale.await.unwrap(), LoadOutcome::Stale);
        source.wait_for_calls(2).await;
        source.release(Ok(ListPage::new(vec![post("p9", 9)], 1, 0, 2)));
        assert_eq!(fresh.await.unwrap(), LoadOutcome::Applied { added: 1 });

        let state = session.snapshot().await;
        let ids: Vec<&str> = state.items().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p9"]);
    }

    #[tokio::test]
    async fn test_dropped_load_can_be_retried() {
        let source = Arc::new(GatedSource::new());
        let initial = ListPage::new(vec![post("p1", 1), post("p2", 2)], 4, 0, 2);
        let session = Arc::new(ListSession::hydrated(
            source.clone(),
            initial,
            SortOrder::Newest,
            ListFilter::default(),
        ));

        let timed_out = tokio::time::timeout(Duration::from_millis(20), session.load_more()).await;
        assert!(timed_out.is_err());
        assert_eq!(source.calls(), 1);
        assert_eq!(session.snapshot().await.status(), ListStatus::Idle);

        let retry = tokio::spawn({
            let session = session.clone();
            async move { session.load_more().await }
        });
        source.wait_for_calls(2).await;
        source.release(Ok(ListPage::new(vec![post("p3", 3), post("p4", 4)], 4, 2, 2)));
        assert_eq!(retry.await.unwrap(), LoadOutcome::Applied { added: 2 });
        assert_eq!(session.snapshot().await.items().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_items() {
        let source = Arc::new(MemorySource::failing());
        let initial = ListPage::new(vec![post("p1", 1)], 3, 0, 1);
        let session = ListSession::hydrated(source, initial, SortOrder::Newest, ListFilter::default());

        assert_eq!(session.load_more().await, LoadOutcome::Failed);
        let state = session.snapshot().await;
        assert_eq!(state.items().len(), 1);
        assert_eq!(state.total(), 3);
        assert!(state.error_message().is_some());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_pages_follow_filter() {
        let mut all = posts(4);
        all[1].tags.push(crate::models::TagRef {
            slug: "rust".into(),
            title: "Rust".into(),
        });
        let source = Arc::new(MemorySource::new(all));
        let filter = ListFilter::new(None, ["rust"]);
        let session = ListSession::empty(source.clone(), 6, SortOrder::Newest, filter.clone());

        session.refresh().await;
        let state = session.snapshot().await;
        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items()[0].id, "p2");
        assert_eq!(
            source.last_query(),
            Some(ListQuery::new(0, 6, SortOrder::Newest, filter))
        );
    }
}
