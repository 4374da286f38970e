//! The content store interface the site reads from.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::listing::ListQuery;
use crate::models::{CategoryCount, Page, Post, PostDetail, SiteSettings, TagSummary};

/// Posts in one list window together with the filtered total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsWindow {
    pub posts: Vec<Post>,
    pub total: usize,
}

/// Read-only queries against the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// One window of listed posts plus the total under the same filter, read from one snapshot.
    async fn query_posts(&self, query: &ListQuery) -> Result<PostsWindow, AppError>;

    /// Listed posts by id in the requested order; unknown ids are skipped.
    async fn posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError>;

    async fn post_by_slug(&self, slug: &str) -> Result<Option<PostDetail>, AppError>;

    async fn post_slugs(&self) -> Result<Vec<String>, AppError>;

    async fn home_page(&self) -> Result<Option<Page>, AppError>;

    async fn landing_page(&self, slug: &str) -> Result<Option<Page>, AppError>;

    /// Every category with the number of listed posts referencing it, by title.
    async fn categories_with_counts(&self) -> Result<Vec<CategoryCount>, AppError>;

    /// Distinct category titles used by any post, ascending.
    async fn unique_categories(&self) -> Result<Vec<String>, AppError>;

    /// Tags referenced by at least one post, by title.
    async fn tags_in_use(&self) -> Result<Vec<TagSummary>, AppError>;

    async fn tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<TagSummary>, AppError>;

    async fn site_settings(&self) -> Result<Option<SiteSettings>, AppError>;
}
