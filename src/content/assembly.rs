//! Page assembly: parse a page's blocks, load the data its list blocks need, then render.

use std::sync::Arc;

use serde::Serialize;

use super::blocks::{parse_blocks, BlogListBlock, BlogListMode, ContentBlock, KeyedBlock, PostsBlock, TagSource};
use super::resolver::{resolve, BlockRenderer, ResolvedBlock};
use crate::db::ContentStore;
use crate::errors::AppError;
use crate::listing::{fetch_page, ListFilter, ListPage, ListQuery, SortOrder};
use crate::models::Page;

/// A page with every block resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledPage<O> {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    pub heros: Vec<ResolvedBlock<O>>,
    pub sections: Vec<ResolvedBlock<O>>,
}

/// Turns stored pages into rendered pages.
pub struct PageAssembler<R> {
    store: Arc<dyn ContentStore>,
    renderer: R,
}

impl<R: BlockRenderer> PageAssembler<R> {
    pub fn new(store: Arc<dyn ContentStore>, renderer: R) -> Self {
        Self { store, renderer }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub async fn assemble(&self, page: &Page) -> AssembledPage<R::Output> {
        let mut heros = parse_blocks(Some(page.heros.as_slice()));
        let mut sections = parse_blocks(Some(page.sections.as_slice()));

        for block in heros.iter_mut().chain(sections.iter_mut()) {
            self.hydrate(block).await;
        }

        AssembledPage {
            id: page.id.clone(),
            title: page.title.clone(),
            seo_title: page.seo_title.clone(),
            heros: heros.iter().map(|b| resolve(&self.renderer, b)).collect(),
            sections: sections.iter().map(|b| resolve(&self.renderer, b)).collect(),
        }
    }

    /// Load list data for a block. Failures leave an empty list behind.
    async fn hydrate(&self, block: &mut KeyedBlock) {
        let result = match &mut block.block {
            ContentBlock::BlogList(list) => self.hydrate_blog_list(list).await,
            ContentBlock::Posts(posts) => self.hydrate_posts(posts).await,
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to load data for block {}: {}", block.key, e);
            match &mut block.block {
                ContentBlock::BlogList(list) => list.page = Some(ListPage::empty(list.limit.max(1))),
                ContentBlock::Posts(posts) => posts.page = Some(ListPage::empty(posts.limit.max(1))),
                _ => {}
            }
        }
    }

    async fn hydrate_blog_list(&self, list: &mut BlogListBlock) -> Result<(), AppError> {
        let page = match list.mode {
            BlogListMode::Latest => {
                let query = ListQuery::new(0, list.limit, SortOrder::Newest, ListFilter::default());
                fetch_page(self.store.as_ref(), &query).await?
            }
            BlogListMode::Manual => {
                let posts = self.store.posts_by_ids(&list.posts).await?;
                let total = posts.len();
                ListPage::new(posts, total, 0, total.max(1))
            }
        };
        list.page = Some(page);
        Ok(())
    }

    async fn hydrate_posts(&self, posts: &mut PostsBlock) -> Result<(), AppError> {
        let filter = ListFilter::new(None, posts.preselected_slugs());
        let query = ListQuery::new(0, posts.limit, posts.sort, filter);
        posts.page = Some(fetch_page(self.store.as_ref(), &query).await?);

        if posts.show_tags {
            posts.available_tags = match posts.tag_source {
                TagSource::Selected => {
                    let slugs = posts.preselected_slugs();
                    self.store.tags_by_slugs(&slugs).await?
                }
                TagSource::All => self.store.tags_in_use().await?,
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::HtmlRenderer;
    use crate::db::PostsWindow;
    use crate::listing::testing::{post, with_tags};
    use crate::models::{CategoryCount, PageKind, Post, PostDetail, SiteSettings, TagSummary};
    use async_trait::async_trait;
    use serde_json::json;

    /// In-memory store; `fail` makes every list query error out.
    struct FakeStore {
        posts: Vec<Post>,
        fail: bool,
    }

    #[async_trait]
    impl ContentStore for FakeStore {
        async fn query_posts(&self, query: &ListQuery) -> Result<PostsWindow, AppError> {
            if self.fail {
                return Err(AppError::Database("unavailable".into()));
            }
            let matching: Vec<Post> = self
                .posts
                .iter()
                .filter(|p| query.filter.matches(p))
                .cloned()
                .collect();
            Ok(PostsWindow {
                total: matching.len(),
                posts: matching.into_iter().skip(query.offset).take(query.limit).collect(),
            })
        }
        async fn posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.posts.iter().find(|p| &p.id == id).cloned())
                .collect())
        }
        async fn post_by_slug(&self, _: &str) -> Result<Option<PostDetail>, AppError> {
            Ok(None)
        }
        async fn post_slugs(&self) -> Result<Vec<String>, AppError> {
            Ok(Vec::new())
        }
        async fn home_page(&self) -> Result<Option<Page>, AppError> {
            Ok(None)
        }
        async fn landing_page(&self, _: &str) -> Result<Option<Page>, AppError> {
            Ok(None)
        }
        async fn categories_with_counts(&self) -> Result<Vec<CategoryCount>, AppError> {
            Ok(Vec::new())
        }
        async fn unique_categories(&self) -> Result<Vec<String>, AppError> {
            Ok(Vec::new())
        }
        async fn tags_in_use(&self) -> Result<Vec<TagSummary>, AppError> {
            Ok(vec![TagSummary { title: "Rust".into(), slug: "rust".into() }])
        }
        async fn tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<TagSummary>, AppError> {
            Ok(slugs
                .iter()
                .map(|s| TagSummary { title: s.to_uppercase(), slug: s.clone() })
                .collect())
        }
        async fn site_settings(&self) -> Result<Option<SiteSettings>, AppError> {
            Ok(None)
        }
    }

    fn page(heros: Vec<serde_json::Value>, sections: Vec<serde_json::Value>) -> Page {
        Page {
            id: "homePage".into(),
            kind: PageKind::HomePage,
            slug: None,
            title: Some("Home".into()),
            seo_title: None,
            heros,
            sections,
        }
    }

    fn assembler(fail: bool) -> PageAssembler<HtmlRenderer> {
        let posts = vec![
            post("p1", 1),
            with_tags(post("p2", 2), &[("rust", "Rust")]),
            post("p3", 3),
            post("p4", 4),
        ];
        PageAssembler::new(Arc::new(FakeStore { posts, fail }), HtmlRenderer::new())
    }

    #[tokio::test]
    async fn test_assemble_skips_unknown_blocks() {
        let page = page(
            vec![json!({ "_type": "hero", "_key": "h", "title": "Welcome" })],
            vec![
                json!({ "_type": "richText", "_key": "a", "body": [] }),
                json!({ "_type": "unknownWidget", "_key": "b" }),
                json!({ "_type": "accordion", "_key": "c", "items": [] }),
            ],
        );

        let assembled = assembler(false).assemble(&page).await;
        assert_eq!(assembled.heros.len(), 1);
        let keys: Vec<&str> = assembled.sections.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert_eq!(assembled.title.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn test_blog_list_modes() {
        let page = page(
            Vec::new(),
            vec![
                json!({ "_type": "blogList", "_key": "latest", "mode": "latest", "limit": 2 }),
                json!({ "_type": "blogList", "_key": "manual", "mode": "manual", "posts": ["p3", "gone", "p1"] }),
            ],
        );

        let assembled = assembler(false).assemble(&page).await;
        let latest = &assembled.sections[0].output;
        assert_eq!(latest.matches("post-card").count(), 2);

        let manual = &assembled.sections[1].output;
        let p3 = manual.find("data-id=\"p3\"").unwrap();
        let p1 = manual.find("data-id=\"p1\"").unwrap();
        assert!(p3 < p1);
        assert_eq!(manual.matches("post-card").count(), 2);
    }

    #[tokio::test]
    async fn test_posts_block_selected_tags() {
        let page = page(
            Vec::new(),
            vec![json!({
                "_type": "posts", "_key": "p",
                "tagSource": "selected",
                "tags": [{ "title": "Rust", "slug": "rust" }]
            })],
        );

        let html = &assembler(false).assemble(&page).await.sections[0].output;
        assert_eq!(html.matches("post-card").count(), 1);
        assert!(html.contains("data-id=\"p2\""));
        assert!(html.contains("data-tag=\"rust\""));
        assert!(html.contains("data-tags=\"rust\""));
    }

    #[tokio::test]
    async fn test_list_failure_degrades_to_empty() {
        let page = page(
            Vec::new(),
            vec![
                json!({ "_type": "posts", "_key": "p" }),
                json!({ "_type": "richText", "_key": "r", "body": [] }),
            ],
        );

        let assembled = assembler(true).assemble(&page).await;
        assert_eq!(assembled.sections.len(), 2);
        assert!(assembled.sections[0].output.contains("data-total=\"0\""));
        assert!(!assembled.sections[0].output.contains("post-card"));
    }
}
