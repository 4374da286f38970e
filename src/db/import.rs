//! NDJSON content export importer.
//!
//! Pass one indexes every document by id. Pass two projects documents into rows, resolving
//! references against that index, and replaces the stored content in one transaction.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::{Menu, MenuItem, PageKind, SiteSettings};

/// Counts of what an import wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub posts: usize,
    pub pages: usize,
    pub categories: usize,
    pub tags: usize,
    pub authors: usize,
    pub skipped: usize,
}

/// Document types that only serve as reference targets.
const INDEX_ONLY_TYPES: &[&str] = &["menu", "sanity.imageAsset"];

/// Import an export file, replacing all stored content.
pub async fn import_ndjson_file(pool: &SqlitePool, path: &Path) -> Result<ImportSummary, AppError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Import(format!("Failed to read {}: {}", path.display(), e)))?;
    tracing::info!("Importing content export from {}", path.display());
    import_ndjson(pool, &text).await
}

/// Import NDJSON text, replacing all stored content.
pub async fn import_ndjson(pool: &SqlitePool, text: &str) -> Result<ImportSummary, AppError> {
    let index = ContentIndex::parse(text)?;
    let mut summary = ImportSummary::default();

    let mut tx = pool.begin().await?;
    for table in ["posts", "pages", "categories", "tags", "authors", "site_settings"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }

    for (id, doc) in index.documents() {
        let doc_type = doc.get("_type").and_then(Value::as_str).unwrap_or_default();
        match doc_type {
            "category" => {
                sqlx::query("INSERT INTO categories (id, title) VALUES (?, ?)")
                    .bind(id)
                    .bind(str_field(doc, "title").unwrap_or_default())
                    .execute(&mut *tx)
                    .await?;
                summary.categories += 1;
            }
            "tag" => {
                sqlx::query("INSERT INTO tags (id, title, slug) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(str_field(doc, "title").unwrap_or_default())
                    .bind(slug_of(doc).unwrap_or_default())
                    .execute(&mut *tx)
                    .await?;
                summary.tags += 1;
            }
            "author" => {
                sqlx::query("INSERT INTO authors (id, name) VALUES (?, ?)")
                    .bind(id)
                    .bind(str_field(doc, "name").unwrap_or_default())
                    .execute(&mut *tx)
                    .await?;
                summary.authors += 1;
            }
            "post" => {
                let row = index.project_post(id, doc);
                sqlx::query(
                    r#"
                    INSERT INTO posts (id, title, slug, excerpt, main_image, author, published_at,
                                       created_at, updated_at, categories, tags, body)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(&row.title)
                .bind(&row.slug)
                .bind(&row.excerpt)
                .bind(&row.main_image)
                .bind(&row.author)
                .bind(&row.published_at)
                .bind(&row.created_at)
                .bind(&row.updated_at)
                .bind(&row.categories)
                .bind(&row.tags)
                .bind(&row.body)
                .execute(&mut *tx)
                .await?;
                summary.posts += 1;
            }
            "homePage" | "landingPage" => {
                let kind = doc_type.parse().unwrap_or(PageKind::LandingPage);
                let heros = index.project_blocks(doc.get("heros"));
                let sections = index.project_blocks(doc.get("sections"));
                sqlx::query(
                    r#"
                    INSERT INTO pages (id, kind, slug, title, seo_title, heros, sections)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(kind.as_str())
                .bind(slug_of(doc))
                .bind(str_field(doc, "title"))
                .bind(str_field(doc, "seoTitle"))
                .bind(to_json(&heros)?)
                .bind(to_json(&sections)?)
                .execute(&mut *tx)
                .await?;
                summary.pages += 1;
            }
            "siteSettings" => {
                let settings = index.project_settings(doc);
                sqlx::query("INSERT OR REPLACE INTO site_settings (id, document) VALUES (1, ?)")
                    .bind(to_json(&settings)?)
                    .execute(&mut *tx)
                    .await?;
            }
            t if INDEX_ONLY_TYPES.contains(&t) => {}
            other => {
                tracing::warn!("Skipping document {} of unknown type {:?}", id, other);
                summary.skipped += 1;
            }
        }
    }

    sqlx::query("UPDATE meta SET imported_at = ? WHERE id = 1")
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        "Imported {} posts, {} pages, {} categories, {} tags, {} authors ({} skipped)",
        summary.posts,
        summary.pages,
        summary.categories,
        summary.tags,
        summary.authors,
        summary.skipped
    );
    Ok(summary)
}

/// A post projected into column values.
struct PostRow {
    title: String,
    slug: Option<String>,
    excerpt: Option<String>,
    main_image: Option<String>,
    author: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
    categories: String,
    tags: String,
    body: String,
}

/// Every published document in an export, by id, in file order.
struct ContentIndex {
    order: Vec<String>,
    docs: HashMap<String, Value>,
}

impl ContentIndex {
    fn parse(text: &str) -> Result<Self, AppError> {
        let mut order = Vec::new();
        let mut docs = HashMap::new();

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut doc: Value = serde_json::from_str(line)
                .map_err(|e| AppError::Import(format!("Line {}: {}", line_no + 1, e)))?;
            let Some(obj) = doc.as_object_mut() else {
                return Err(AppError::Import(format!("Line {}: not an object", line_no + 1)));
            };

            let id = match obj.get("_id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    obj.insert("_id".to_string(), Value::String(id.clone()));
                    id
                }
            };

            // unpublished edits live beside the published document
            if id.starts_with("drafts.") {
                continue;
            }

            if docs.insert(id.clone(), doc).is_none() {
                order.push(id);
            }
        }

        Ok(Self { order, docs })
    }

    fn documents(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(|id| self.docs.get(id).map(|doc| (id.as_str(), doc)))
    }

    fn resolve(&self, reference: Option<&Value>) -> Option<&Value> {
        reference.and_then(reference_id).and_then(|id| self.docs.get(id))
    }

    /// URL of an image field: a plain URL, an expanded asset, or an asset reference.
    fn image_url(&self, image: Option<&Value>) -> Option<String> {
        let image = image?;
        if let Some(url) = image.as_str() {
            return Some(url.to_string());
        }
        let asset = image.get("asset")?;
        if let Some(url) = str_field(asset, "url") {
            return Some(url);
        }
        self.resolve(Some(asset)).and_then(|a| str_field(a, "url"))
    }

    /// A link object reduced to `{ label, href, ariaLabel?, openInNewTab }`.
    fn project_link(&self, link: &Value, fallback_label: Option<&str>) -> Value {
        if let Some(url) = link.as_str() {
            return json!({
                "label": fallback_label.unwrap_or_default(),
                "href": url,
                "openInNewTab": false,
            });
        }

        let link_type = str_field(link, "linkType").unwrap_or_default();
        let href = match link_type.as_str() {
            "external" => str_field(link, "external"),
            "internal" => self
                .resolve(link.get("internal"))
                .and_then(slug_of)
                .map(|slug| format!("/{slug}")),
            _ => None,
        }
        .unwrap_or_else(|| "/".to_string());

        let open_in_new_tab = link_type == "external"
            && link.get("openInNewTab").and_then(Value::as_bool).unwrap_or(false);

        let mut out = Map::new();
        out.insert(
            "label".to_string(),
            Value::String(
                str_field(link, "label")
                    .or_else(|| fallback_label.map(str::to_string))
                    .unwrap_or_default(),
            ),
        );
        out.insert("href".to_string(), Value::String(href));
        if let Some(aria) = str_field(link, "ariaLabel") {
            out.insert("ariaLabel".to_string(), Value::String(aria));
        }
        out.insert("openInNewTab".to_string(), Value::Bool(open_in_new_tab));
        Value::Object(out)
    }

    fn project_blocks(&self, blocks: Option<&Value>) -> Vec<Value> {
        blocks
            .and_then(Value::as_array)
            .map(|blocks| blocks.iter().map(|b| self.project_block(b)).collect())
            .unwrap_or_default()
    }

    /// Resolve the references inside one page block. Block types this importer does not
    /// know pass through untouched.
    fn project_block(&self, block: &Value) -> Value {
        let Some(obj) = block.as_object() else {
            return block.clone();
        };
        let mut out = obj.clone();
        let block_type = str_field(block, "_type").unwrap_or_default();

        match block_type.as_str() {
            "hero" | "imageTeaser" => {
                self.project_image_and_link(&mut out);
            }
            "teaserList" => {
                if let Some(Value::Array(items)) = out.get_mut("items") {
                    for item in items.iter_mut() {
                        if let Some(item) = item.as_object_mut() {
                            self.project_image_and_link(item);
                        }
                    }
                }
            }
            "blogList" => {
                let ids: Vec<Value> = obj
                    .get("posts")
                    .and_then(Value::as_array)
                    .map(|refs| {
                        refs.iter()
                            .filter_map(reference_id)
                            .map(|id| Value::String(id.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                out.insert("posts".to_string(), Value::Array(ids));
            }
            "posts" | "postsList" | "postsModule" => {
                let tags: Vec<Value> = obj
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|refs| {
                        refs.iter()
                            .filter_map(|r| self.resolve(Some(r)).or(Some(r)))
                            .filter_map(|tag| {
                                let slug = slug_of(tag)?;
                                Some(json!({
                                    "title": str_field(tag, "title").unwrap_or_default(),
                                    "slug": slug,
                                }))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                out.insert("tags".to_string(), Value::Array(tags));

                if !out.contains_key("moreHref") {
                    if let Some(slug) = self.resolve(obj.get("moreLandingPage")).and_then(slug_of) {
                        out.insert("moreHref".to_string(), Value::String(format!("/{slug}")));
                    }
                }
                out.remove("moreLandingPage");
            }
            _ => {}
        }

        Value::Object(out)
    }

    fn project_image_and_link(&self, obj: &mut Map<String, Value>) {
        match self.image_url(obj.get("image")) {
            Some(url) => {
                obj.insert("image".to_string(), Value::String(url));
            }
            None => {
                obj.remove("image");
            }
        }

        let label = obj.get("linkLabel").and_then(Value::as_str).map(str::to_string);
        if let Some(link) = obj.get("link").cloned() {
            if link.is_null() {
                obj.remove("link");
            } else {
                obj.insert("link".to_string(), self.project_link(&link, label.as_deref()));
            }
        }
    }

    fn project_post(&self, id: &str, doc: &Value) -> PostRow {
        let author = self.resolve(doc.get("author")).map(|a| {
            json!({
                "_id": a.get("_id").cloned().unwrap_or(Value::Null),
                "name": str_field(a, "name").unwrap_or_default(),
            })
            .to_string()
        });

        let categories: Vec<Value> = self
            .resolve_all(doc.get("categories"))
            .map(|c| {
                json!({
                    "_id": c.get("_id").cloned().unwrap_or(Value::Null),
                    "title": str_field(c, "title").unwrap_or_default(),
                })
            })
            .collect();

        let tags: Vec<Value> = self
            .resolve_all(doc.get("tags"))
            .filter_map(|t| {
                Some(json!({
                    "slug": slug_of(t)?,
                    "title": str_field(t, "title").unwrap_or_default(),
                }))
            })
            .collect();

        let created_at = str_field(doc, "_createdAt")
            .map(|ts| normalize_timestamp(&ts))
            .unwrap_or_else(|| {
                tracing::warn!("Post {} has no _createdAt; using import time", id);
                now_timestamp()
            });
        let updated_at = str_field(doc, "_updatedAt")
            .map(|ts| normalize_timestamp(&ts))
            .unwrap_or_else(|| created_at.clone());

        PostRow {
            title: str_field(doc, "title").unwrap_or_default(),
            slug: slug_of(doc),
            excerpt: str_field(doc, "excerpt"),
            main_image: self.image_url(doc.get("mainImage")),
            author,
            published_at: str_field(doc, "publishedAt").map(|ts| normalize_timestamp(&ts)),
            created_at,
            updated_at,
            categories: Value::Array(categories).to_string(),
            tags: Value::Array(tags).to_string(),
            body: doc
                .get("body")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()))
                .to_string(),
        }
    }

    /// Resolve an array of references, dropping dangling ones.
    fn resolve_all<'a>(&'a self, refs: Option<&'a Value>) -> impl Iterator<Item = &'a Value> + 'a {
        refs.and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(move |r| self.resolve(Some(r)))
    }

    fn project_settings(&self, doc: &Value) -> SiteSettings {
        let header_menu = self.resolve(doc.get("headerMenu")).map(|menu| Menu {
            title: str_field(menu, "title").unwrap_or_default(),
            items: menu
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| MenuItem {
                            label: str_field(item, "label").unwrap_or_default(),
                            href: self
                                .resolve(item.get("target"))
                                .and_then(slug_of)
                                .map(|slug| format!("/{slug}"))
                                .unwrap_or_else(|| "/".to_string()),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        });

        SiteSettings {
            site_title: str_field(doc, "siteTitle").unwrap_or_default(),
            logo: self.image_url(doc.get("logo")),
            default_seo: doc.get("defaultSeo").cloned(),
            header_menu,
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Import(format!("Failed to encode document: {}", e)))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// The routable slug of a document: `slug.current`, or a bare string slug.
fn slug_of(doc: &Value) -> Option<String> {
    let slug = doc.get("slug")?;
    slug.get("current")
        .and_then(Value::as_str)
        .or_else(|| slug.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn reference_id(value: &Value) -> Option<&str> {
    value.get("_ref").and_then(Value::as_str)
}

/// RFC 3339 timestamps are stored in UTC with millisecond precision so they order as text.
fn normalize_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        Err(_) => {
            tracing::warn!("Keeping unparsable timestamp {:?} as is", raw);
            raw.to_string()
        }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, ContentStore, Repository};
    use tempfile::TempDir;

    fn index(lines: &[Value]) -> ContentIndex {
        let text: Vec<String> = lines.iter().map(Value::to_string).collect();
        ContentIndex::parse(&text.join("\n")).unwrap()
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2024-03-01T10:00:00+02:00"),
            "2024-03-01T08:00:00.000Z"
        );
        assert_eq!(normalize_timestamp("2024-03-01T08:00:00Z"), "2024-03-01T08:00:00.000Z");
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_drafts_skipped_and_ids_assigned() {
        let index = index(&[
            json!({ "_id": "drafts.p1", "_type": "post" }),
            json!({ "_type": "category", "title": "No id" }),
            json!({ "_id": "p1", "_type": "post" }),
        ]);

        let ids: Vec<&str> = index.documents().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), 2);
        assert!(uuid::Uuid::parse_str(ids[0]).is_ok());
        assert_eq!(ids[1], "p1");
    }

    #[test]
    fn test_invalid_line_is_an_import_error() {
        let err = ContentIndex::parse("{\"_id\":\"a\"}\n{oops").err().unwrap();
        assert!(matches!(err, AppError::Import(ref msg) if msg.starts_with("Line 2")));
    }

    #[test]
    fn test_link_projection() {
        let index = index(&[json!({ "_id": "lp", "_type": "landingPage", "slug": { "current": "about" } })]);

        let internal = index.project_link(
            &json!({ "label": "About", "linkType": "internal", "internal": { "_ref": "lp" } }),
            None,
        );
        assert_eq!(internal["href"], "/about");
        assert_eq!(internal["openInNewTab"], false);

        let external = index.project_link(
            &json!({ "label": "Docs", "linkType": "external", "external": "https://x.dev", "openInNewTab": true }),
            None,
        );
        assert_eq!(external["href"], "https://x.dev");
        assert_eq!(external["openInNewTab"], true);

        let dangling = index.project_link(
            &json!({ "label": "Gone", "linkType": "internal", "internal": { "_ref": "missing" } }),
            None,
        );
        assert_eq!(dangling["href"], "/");

        let bare = index.project_link(&json!("https://y.dev"), Some("Read"));
        assert_eq!(bare["label"], "Read");
        assert_eq!(bare["href"], "https://y.dev");
    }

    #[test]
    fn test_block_projection() {
        let index = index(&[
            json!({ "_id": "img", "_type": "sanity.imageAsset", "url": "https://cdn/x.png" }),
            json!({ "_id": "t1", "_type": "tag", "title": "Rust", "slug": { "current": "rust" } }),
            json!({ "_id": "lp", "_type": "landingPage", "slug": { "current": "blog" } }),
        ]);

        let hero = index.project_block(&json!({
            "_type": "hero", "_key": "h", "title": "Hi",
            "image": { "asset": { "_ref": "img" } }
        }));
        assert_eq!(hero["image"], "https://cdn/x.png");

        let list = index.project_block(&json!({
            "_type": "blogList", "mode": "manual",
            "posts": [{ "_ref": "p2" }, { "_ref": "p1" }]
        }));
        assert_eq!(list["posts"], json!(["p2", "p1"]));

        let module = index.project_block(&json!({
            "_type": "postsModule", "tagSource": "selected",
            "tags": [{ "_ref": "t1" }, { "_ref": "missing" }],
            "moreLinkMode": "link", "moreLandingPage": { "_ref": "lp" }
        }));
        assert_eq!(module["tags"], json!([{ "title": "Rust", "slug": "rust" }]));
        assert_eq!(module["moreHref"], "/blog");
        assert!(module.get("moreLandingPage").is_none());

        let unknown = json!({ "_type": "unknownWidget", "x": 1 });
        assert_eq!(index.project_block(&unknown), unknown);
    }

    #[tokio::test]
    async fn test_import_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("c.sqlite")).await.unwrap();

        let first = [
            json!({ "_id": "c1", "_type": "category", "title": "News" }),
            json!({ "_id": "p1", "_type": "post", "title": "One", "slug": { "current": "one" },
                    "_createdAt": "2024-01-01T00:00:00Z", "categories": [{ "_ref": "c1" }] }),
            json!({ "_id": "x1", "_type": "sanity.fileAsset" }),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        let summary = import_ndjson(&pool, &first).await.unwrap();
        assert_eq!(summary.posts, 1);
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.skipped, 1);

        let second = json!({ "_id": "p2", "_type": "post", "title": "Two", "slug": { "current": "two" },
                             "_createdAt": "2024-01-02T00:00:00Z" })
        .to_string();
        import_ndjson(&pool, &second).await.unwrap();

        let repo = Repository::new(pool);
        assert_eq!(repo.post_slugs().await.unwrap(), vec!["two"]);
        assert!(repo.categories_with_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_import_keeps_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("c.sqlite")).await.unwrap();

        let good = json!({ "_id": "p1", "_type": "post", "title": "One", "slug": { "current": "one" },
                           "_createdAt": "2024-01-01T00:00:00Z" })
        .to_string();
        import_ndjson(&pool, &good).await.unwrap();

        assert!(import_ndjson(&pool, "not json").await.is_err());
        let repo = Repository::new(pool);
        assert_eq!(repo.post_slugs().await.unwrap(), vec!["one"]);
    }
}
