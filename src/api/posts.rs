//! Post API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{found, ApiResult};
use crate::listing::{fetch_page, ListFilter, ListQuery};
use crate::models::{Post, PostDetail};
use crate::AppState;

/// Raw `GET /api/posts` parameters. Everything stays a string so bad input is coerced,
/// never rejected.
#[derive(Debug, Default, PartialEq)]
pub struct PostsParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub sort: Option<String>,
    pub tags: Option<String>,
}

impl PostsParams {
    /// Collect parameters from the decoded query pairs. A repeated name keeps its first
    /// value; unknown names are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "limit" => &mut params.limit,
                "offset" => &mut params.offset,
                "category" => &mut params.category,
                "mode" => &mut params.mode,
                "sort" => &mut params.sort,
                "tags" => &mut params.tags,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsResponse {
    pub posts: Vec<Post>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub mode: String,
    pub category: String,
    pub sort: String,
    pub tags: Vec<String>,
}

/// GET /api/posts - One page of posts plus the filtered total.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<PostsResponse> {
    let params = PostsParams::from_pairs(pairs);
    let filter = ListFilter::from_params(params.category.as_deref(), params.tags.as_deref());
    let query = ListQuery::from_raw(
        params.limit.as_deref(),
        params.offset.as_deref(),
        params.sort.as_deref(),
        filter,
    );

    let page = fetch_page(state.store.as_ref(), &query).await?;
    let has_more = page.has_more();

    Ok(Json(PostsResponse {
        posts: page.items,
        total: page.total,
        offset: page.offset,
        limit: page.limit,
        has_more,
        mode: params
            .mode
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "latest".to_string()),
        category: params.category.unwrap_or_default(),
        sort: query.sort.as_str().to_string(),
        tags: query.filter.tags,
    }))
}

#[derive(Debug, Serialize)]
pub struct SlugsResponse {
    pub slugs: Vec<String>,
}

/// GET /api/posts/slugs - Every routable post slug.
pub async fn list_post_slugs(State(state): State<AppState>) -> ApiResult<SlugsResponse> {
    let slugs = state.store.post_slugs().await?;
    Ok(Json(SlugsResponse { slugs }))
}

/// GET /api/posts/{slug} - A single post with its body.
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<PostDetail> {
    let post = state.store.post_by_slug(&slug).await?;
    found(post, &format!("Post '{}'", slug))
}
