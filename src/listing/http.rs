//! Page source that calls the `GET /api/posts` endpoint over HTTP.

use async_trait::async_trait;
use serde_json::Value;

use super::{ListPage, ListQuery, LoadError, PageSource};
use crate::errors::AppError;
use crate::models::Post;

/// Loads list pages from a running blog backend.
#[derive(Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn posts_url(&self) -> String {
        format!("{}/api/posts", self.base_url)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, query: &ListQuery) -> Result<ListPage, LoadError> {
        let response = self
            .client
            .get(self.posts_url())
            .query(&query.to_params())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(AppError::from)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("GET {} answered {}", self.posts_url(), status);
            return Err(LoadError::Status(status.as_u16()));
        }

        let body: Value = response.json().await.map_err(AppError::from)?;

        parse_posts_body(&body, query)
    }
}

/// Validate a `/api/posts` body. The shape is checked, never trusted.
pub(crate) fn parse_posts_body(body: &Value, query: &ListQuery) -> Result<ListPage, LoadError> {
    let raw_posts = body
        .get("posts")
        .and_then(Value::as_array)
        .ok_or_else(|| LoadError::Malformed("posts not array".to_string()))?;

    let items = raw_posts
        .iter()
        .map(|p| serde_json::from_value::<Post>(p.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::Malformed(format!("invalid post: {}", e)))?;

    let total = match body.get("total") {
        None | Some(Value::Null) => query.offset.saturating_add(items.len()),
        Some(raw) => raw
            .as_u64()
            .and_then(|t| usize::try_from(t).ok())
            .ok_or_else(|| LoadError::Malformed(format!("invalid total: {}", raw)))?,
    };

    // the window starts where we asked for it, whatever upstream echoes back
    Ok(ListPage::new(items, total, query.offset, query.limit))
}
