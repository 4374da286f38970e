//! Where list pages come from.

use std::sync::Arc;

use async_trait::async_trait;

use super::{fetch_page, ListPage, ListQuery};
use crate::db::ContentStore;
use crate::errors::AppError;

/// Why a page could not be loaded. Always recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Upstream unreachable
    Transport(String),
    /// Upstream answered with a non-2xx status
    Status(u16),
    /// Upstream answered with a body of the wrong shape
    Malformed(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Transport(msg) => write!(f, "Failed to load more posts: {}", msg),
            LoadError::Status(status) => write!(f, "Request failed: {}", status),
            LoadError::Malformed(msg) => write!(f, "Malformed response ({})", msg),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<AppError> for LoadError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::MalformedResponse(msg) => LoadError::Malformed(msg),
            AppError::NotFound(_) => LoadError::Status(404),
            AppError::BadRequest(_) => LoadError::Status(400),
            other => LoadError::Transport(other.message()),
        }
    }
}

/// Fetches one page of posts for a list query.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &ListQuery) -> Result<ListPage, LoadError>;
}

/// Reads pages straight from a content store.
#[derive(Clone)]
pub struct StorePageSource {
    store: Arc<dyn ContentStore>,
}

impl StorePageSource {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PageSource for StorePageSource {
    async fn fetch_page(&self, query: &ListQuery) -> Result<ListPage, LoadError> {
        Ok(fetch_page(self.store.as_ref(), query).await?)
    }
}
