//! SQLite implementation of the content store.
//!
//! List queries build their WHERE clause once and apply it to both the item and the count
//! query, inside one read transaction, so `total` always describes the same snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{ContentStore, PostsWindow};
use crate::errors::AppError;
use crate::listing::{ListFilter, ListQuery};
use crate::models::{
    CategoryCount, Page, PageKind, Post, PostDetail, SiteSettings, TagSummary,
};

const POST_LIST_COLUMNS: &str = "p.id, p.title, p.slug, p.excerpt, p.main_image, p.author, \
     p.published_at, p.created_at, p.categories, p.tags";

const PAGE_COLUMNS: &str = "id, kind, slug, title, seo_title, heros, sections";

/// Database repository for all content reads.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// When content was last imported, if ever.
    pub async fn imported_at(&self) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT imported_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("imported_at"))
    }
}

/// Restrict `p` (posts) to listed posts matching the filter.
fn push_post_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter) {
    qb.push(" WHERE p.slug IS NOT NULL AND p.slug <> ''");

    if let Some(category) = &filter.category {
        qb.push(
            " AND EXISTS (SELECT 1 FROM json_each(p.categories) c \
             WHERE json_extract(c.value, '$.title') = ",
        );
        qb.push_bind(category.clone());
        qb.push(")");
    }

    if !filter.tags.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM json_each(p.tags) t \
             WHERE json_extract(t.value, '$.slug') IN (",
        );
        let mut slugs = qb.separated(", ");
        for slug in &filter.tags {
            slugs.push_bind(slug.clone());
        }
        qb.push("))");
    }
}

#[async_trait]
impl ContentStore for Repository {
    async fn query_posts(&self, query: &ListQuery) -> Result<PostsWindow, AppError> {
        let direction = query.sort.sql_direction();

        let mut items = QueryBuilder::<Sqlite>::new(format!("SELECT {POST_LIST_COLUMNS} FROM posts p"));
        push_post_filter(&mut items, &query.filter);
        items.push(format!(
            " ORDER BY COALESCE(p.published_at, p.created_at) {direction}, p.id {direction} LIMIT "
        ));
        items.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
        items.push(" OFFSET ");
        items.push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM posts p");
        push_post_filter(&mut count, &query.filter);

        let mut tx = self.pool.begin().await?;
        let rows = items.build().fetch_all(&mut *tx).await?;
        let total: i64 = count.build().fetch_one(&mut *tx).await?.get("total");
        tx.commit().await?;

        Ok(PostsWindow {
            posts: rows.iter().map(post_from_row).collect(),
            total: total.max(0) as usize,
        })
    }

    async fn posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {POST_LIST_COLUMNS} FROM posts p"));
        push_post_filter(&mut qb, &ListFilter::default());
        qb.push(" AND p.id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        qb.push(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut by_id: HashMap<String, Post> = rows
            .iter()
            .map(post_from_row)
            .map(|post| (post.id.clone(), post))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<PostDetail>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {POST_LIST_COLUMNS}, p.body, p.updated_at FROM posts p WHERE p.slug = ? LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(|row| {
            let body: Option<String> = row.get("body");
            PostDetail {
                post: post_from_row(row),
                body: body
                    .map(|b| parse_json_or_default::<serde_json::Value>(&b))
                    .unwrap_or(serde_json::Value::Array(Vec::new())),
                updated_at: row.get("updated_at"),
            }
        }))
    }

    async fn post_slugs(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT slug FROM posts WHERE slug IS NOT NULL AND slug <> '' ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("slug")).collect())
    }

    async fn home_page(&self) -> Result<Option<Page>, AppError> {
        // Prefer the singleton id, but accept any home page document
        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE kind = ? ORDER BY (id = 'homePage') DESC, id LIMIT 1"
        ))
        .bind(PageKind::HomePage.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(page_from_row))
    }

    async fn landing_page(&self, slug: &str) -> Result<Option<Page>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE kind = ? AND slug = ? LIMIT 1"
        ))
        .bind(PageKind::LandingPage.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(page_from_row))
    }

    async fn categories_with_counts(&self) -> Result<Vec<CategoryCount>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT c.title AS title,
                   (SELECT COUNT(*) FROM posts p
                     WHERE p.slug IS NOT NULL AND p.slug <> ''
                       AND EXISTS (SELECT 1 FROM json_each(p.categories) j
                                    WHERE json_extract(j.value, '$._id') = c.id)) AS count
            FROM categories c
            WHERE c.title <> ''
            ORDER BY c.title ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let count: i64 = row.get("count");
                CategoryCount {
                    title: row.get("title"),
                    count: count.max(0) as usize,
                }
            })
            .collect())
    }

    async fn unique_categories(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT json_extract(j.value, '$.title') AS title
            FROM posts p, json_each(p.categories) j
            WHERE json_extract(j.value, '$.title') IS NOT NULL
            ORDER BY title ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("title")).collect())
    }

    async fn tags_in_use(&self) -> Result<Vec<TagSummary>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT t.title AS title, t.slug AS slug
            FROM tags t
            WHERE t.slug <> ''
              AND EXISTS (SELECT 1 FROM posts p, json_each(p.tags) j
                           WHERE json_extract(j.value, '$.slug') = t.slug)
            ORDER BY t.title ASC, t.slug ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_summary_from_row).collect())
    }

    async fn tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<TagSummary>, AppError> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT title, slug FROM tags WHERE slug IN (");
        let mut separated = qb.separated(", ");
        for slug in slugs {
            separated.push_bind(slug.clone());
        }
        qb.push(") ORDER BY title ASC, slug ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(tag_summary_from_row).collect())
    }

    async fn site_settings(&self) -> Result<Option<SiteSettings>, AppError> {
        let row = sqlx::query("SELECT document FROM site_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let document: String = row.get("document");
                Ok(Some(serde_json::from_str(&document).map_err(|e| {
                    AppError::Database(format!("Corrupt site settings document: {}", e))
                })?))
            }
            None => Ok(None),
        }
    }
}

// Helper functions for row conversion

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    let author: Option<String> = row.get("author");
    let categories: String = row.get("categories");
    let tags: String = row.get("tags");
    Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get::<Option<String>, _>("slug").unwrap_or_default(),
        excerpt: row.get("excerpt"),
        main_image: row.get("main_image"),
        author: author.and_then(|a| serde_json::from_str(&a).ok()),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        categories: parse_json_or_default(&categories),
        tags: parse_json_or_default(&tags),
    }
}

fn page_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<Page> {
    let kind: String = row.get("kind");
    let heros: String = row.get("heros");
    let sections: String = row.get("sections");
    Some(Page {
        id: row.get("id"),
        kind: kind.parse::<PageKind>().ok()?,
        slug: row.get("slug"),
        title: row.get("title"),
        seo_title: row.get("seo_title"),
        heros: parse_json_or_default(&heros),
        sections: parse_json_or_default(&sections),
    })
}

fn tag_summary_from_row(row: &sqlx::sqlite::SqliteRow) -> TagSummary {
    TagSummary {
        title: row.get("title"),
        slug: row.get("slug"),
    }
}

fn parse_json_or_default<T: DeserializeOwned + Default>(s: &str) -> T {
    serde_json::from_str(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{import_ndjson, init_database};
    use crate::listing::{fetch_page, SortOrder};
    use crate::tests::sample_export;
    use tempfile::TempDir;

    async fn seeded() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("content.sqlite"))
            .await
            .expect("Failed to init DB");
        import_ndjson(&pool, &sample_export()).await.expect("Failed to import");
        (Repository::new(pool), temp_dir)
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_newest_first_with_created_at_fallback() {
        let (repo, _dir) = seeded().await;
        let window = repo.query_posts(&ListQuery::new(0, 50, SortOrder::Newest, ListFilter::default())).await.unwrap();

        // post-8 has no publishedAt and falls back to its creation date;
        // post-3 and post-4 share a timestamp and tie-break on id
        assert_eq!(
            ids(&window.posts),
            vec!["post-9", "post-8", "post-7", "post-6", "post-5", "post-4", "post-3", "post-2", "post-1"]
        );
        // the slugless draft is never listed
        assert_eq!(window.total, 9);
    }

    #[tokio::test]
    async fn test_oldest_first() {
        let (repo, _dir) = seeded().await;
        let window = repo.query_posts(&ListQuery::new(0, 3, SortOrder::Oldest, ListFilter::default())).await.unwrap();
        assert_eq!(ids(&window.posts), vec!["post-1", "post-2", "post-3"]);
    }

    #[tokio::test]
    async fn test_consecutive_pages_do_not_overlap() {
        let (repo, _dir) = seeded().await;
        let first = fetch_page(&repo, &ListQuery::new(0, 6, SortOrder::Newest, ListFilter::default())).await.unwrap();
        let second = fetch_page(&repo, &first_query_next(&first)).await.unwrap();

        assert_eq!(first.items.len(), 6);
        assert_eq!(second.items.len(), 3);
        assert!(first.has_more());
        assert!(!second.has_more());

        let mut all: Vec<&str> = ids(&first.items);
        all.extend(ids(&second.items));
        let mut deduped = all.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), all.len());

        let whole = repo.query_posts(&ListQuery::new(0, 50, SortOrder::Newest, ListFilter::default())).await.unwrap();
        assert_eq!(all, ids(&whole.posts));
    }

    fn first_query_next(first: &crate::listing::ListPage) -> ListQuery {
        ListQuery::new(first.offset + first.items.len(), first.limit, SortOrder::Newest, ListFilter::default())
    }

    #[tokio::test]
    async fn test_category_filter_applies_to_total() {
        let (repo, _dir) = seeded().await;
        let query = ListQuery::new(0, 2, SortOrder::Newest, ListFilter::category("Engineering"));
        let window = repo.query_posts(&query).await.unwrap();

        assert_eq!(window.total, 4);
        assert_eq!(window.posts.len(), 2);
        assert!(window
            .posts
            .iter()
            .all(|p| p.categories.iter().any(|c| c.title == "Engineering")));
    }

    #[tokio::test]
    async fn test_tag_filter_matches_any() {
        let (repo, _dir) = seeded().await;
        let query = ListQuery::new(0, 50, SortOrder::Newest, ListFilter::new(None, ["rust", "design"]));
        let window = repo.query_posts(&query).await.unwrap();
        assert_eq!(ids(&window.posts), vec!["post-6", "post-5", "post-2"]);
        assert_eq!(window.total, 3);

        let query = ListQuery::new(0, 50, SortOrder::Newest, ListFilter::new(Some("News"), ["design"]));
        assert_eq!(repo.query_posts(&query).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_empty_category_means_no_filter() {
        let (repo, _dir) = seeded().await;
        let filter = ListFilter::from_params(Some(""), Some(""));
        let window = repo.query_posts(&ListQuery::new(0, 6, SortOrder::Newest, filter)).await.unwrap();
        assert_eq!(window.total, 9);
    }

    #[tokio::test]
    async fn test_post_projection() {
        let (repo, _dir) = seeded().await;
        let detail = repo.post_by_slug("post-two").await.unwrap().unwrap();

        assert_eq!(detail.post.id, "post-2");
        assert_eq!(detail.post.author.as_ref().unwrap().name, "Ada");
        assert_eq!(detail.post.main_image.as_deref(), Some("https://cdn.example.com/two.png"));
        assert_eq!(detail.post.tags[0].slug, "rust");
        assert!(detail.body.is_array());

        assert!(repo.post_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_posts_by_ids_keeps_requested_order() {
        let (repo, _dir) = seeded().await;
        let posts = repo
            .posts_by_ids(&["post-3".into(), "nope".into(), "post-1".into()])
            .await
            .unwrap();
        assert_eq!(ids(&posts), vec!["post-3", "post-1"]);
    }

    #[tokio::test]
    async fn test_taxonomy_queries() {
        let (repo, _dir) = seeded().await;

        let counts = repo.categories_with_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                CategoryCount { title: "Archive".into(), count: 0 },
                CategoryCount { title: "Engineering".into(), count: 4 },
                CategoryCount { title: "News".into(), count: 3 },
            ]
        );

        assert_eq!(repo.unique_categories().await.unwrap(), vec!["Engineering", "News"]);

        let tags = repo.tags_in_use().await.unwrap();
        let slugs: Vec<&str> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["design", "rust"]);

        let selected = repo.tags_by_slugs(&["rust".into(), "unused".into()]).await.unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[tokio::test]
    async fn test_pages_and_settings() {
        let (repo, _dir) = seeded().await;

        let home = repo.home_page().await.unwrap().unwrap();
        assert_eq!(home.kind, PageKind::HomePage);
        assert_eq!(home.heros.len(), 1);

        let about = repo.landing_page("about").await.unwrap().unwrap();
        assert_eq!(about.title.as_deref(), Some("About us"));
        assert!(repo.landing_page("nope").await.unwrap().is_none());

        let settings = repo.site_settings().await.unwrap().unwrap();
        assert_eq!(settings.site_title, "Field Notes");
        let menu = settings.header_menu.unwrap();
        assert_eq!(menu.items[0].href, "/about");

        assert!(repo.imported_at().await.unwrap().is_some());
        assert_eq!(repo.post_slugs().await.unwrap().len(), 9);
    }
}
