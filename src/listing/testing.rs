//! Fixtures shared by the listing tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};

use super::{ListPage, ListQuery, LoadError, PageSource, SortOrder};
use crate::models::{CategoryRef, Post, TagRef};

/// A post published `n` hours after 2024-01-01T00:00Z.
pub fn post(id: &str, n: u32) -> Post {
    let published = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc)
        + chrono::Duration::hours(n as i64);
    let published = published.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    Post {
        id: id.to_string(),
        title: format!("Post {id}"),
        slug: id.to_string(),
        excerpt: None,
        main_image: None,
        author: None,
        published_at: Some(published.clone()),
        created_at: published,
        categories: Vec::new(),
        tags: Vec::new(),
    }
}

pub fn with_categories(mut post: Post, titles: &[&str]) -> Post {
    post.categories = titles
        .iter()
        .map(|t| CategoryRef {
            id: format!("cat-{t}"),
            title: t.to_string(),
        })
        .collect();
    post
}

pub fn with_tags(mut post: Post, tags: &[(&str, &str)]) -> Post {
    post.tags = tags
        .iter()
        .map(|(slug, title)| TagRef {
            slug: slug.to_string(),
            title: title.to_string(),
        })
        .collect();
    post
}

/// Serves pages from a fixed in-memory post list.
pub struct MemorySource {
    posts: Vec<Post>,
    fail: bool,
    calls: AtomicUsize,
    last: std::sync::Mutex<Option<ListQuery>>,
}

impl MemorySource {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            fail: false,
            calls: AtomicUsize::new(0),
            last: std::sync::Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<ListQuery> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MemorySource {
    async fn fetch_page(&self, query: &ListQuery) -> Result<ListPage, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(query.clone());
        if self.fail {
            return Err(LoadError::Status(500));
        }

        let mut matching: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| query.filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            let order = a.sort_key().cmp(b.sort_key()).then_with(|| a.id.cmp(&b.id));
            match query.sort {
                SortOrder::Newest => order.reverse(),
                SortOrder::Oldest => order,
            }
        });

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        Ok(ListPage::new(items, total, query.offset, query.limit))
    }
}

/// Holds every fetch until the test releases a result for it.
pub struct GatedSource {
    calls: watch::Sender<usize>,
    results_tx: mpsc::UnboundedSender<Result<ListPage, LoadError>>,
    results_rx: Mutex<mpsc::UnboundedReceiver<Result<ListPage, LoadError>>>,
}

impl GatedSource {
    pub fn new() -> Self {
        let (calls, _) = watch::channel(0);
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            calls,
            results_tx,
            results_rx: Mutex::new(results_rx),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.calls.subscribe();
        rx.wait_for(|calls| *calls >= n).await.unwrap();
    }

    pub fn release(&self, result: Result<ListPage, LoadError>) {
        self.results_tx.send(result).unwrap();
    }
}

#[async_trait]
impl PageSource for GatedSource {
    async fn fetch_page(&self, _query: &ListQuery) -> Result<ListPage, LoadError> {
        self.calls.send_modify(|calls| *calls += 1);
        let mut results = self.results_rx.lock().await;
        results
            .recv()
            .await
            .unwrap_or_else(|| Err(LoadError::Transport("gate closed".to_string())))
    }
}
