//! Paginated post listings.
//!
//! Server side, [`fetch_page`] runs a coerced [`ListQuery`] against the content store.
//! Client side, [`ListSession`] accumulates pages for "load more" lists and
//! [`FilteredLists`] keeps one session per filter.

mod cache;
mod counts;
mod http;
mod page;
mod query;
mod session;
mod source;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::*;
pub use counts::*;
pub use http::HttpPageSource;
pub use page::*;
pub use query::*;
pub use session::*;
pub use source::*;
pub use state::*;

use crate::db::ContentStore;
use crate::errors::AppError;

/// Fetch one page of posts and the filtered total from the store.
pub async fn fetch_page(store: &dyn ContentStore, query: &ListQuery) -> Result<ListPage, AppError> {
    let window = store.query_posts(query).await?;
    tracing::debug!(
        "Fetched {} of {} posts at offset {} (limit {}, sort {}, filter {:?})",
        window.posts.len(),
        window.total,
        query.offset,
        query.limit,
        query.sort.as_str(),
        query.filter
    );
    Ok(ListPage::new(window.posts, window.total, query.offset, query.limit))
}
