//! Category and tag API endpoints.

use axum::{extract::State, Json};

use super::ApiResult;
use crate::models::{CategoryCount, TagSummary};
use crate::AppState;

/// GET /api/categories - Every category with its post count.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryCount>> {
    Ok(Json(state.store.categories_with_counts().await?))
}

/// GET /api/categories/unique - Category titles in use.
pub async fn list_unique_categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.store.unique_categories().await?))
}

/// GET /api/tags - Tags attached to at least one post.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<TagSummary>> {
    Ok(Json(state.store.tags_in_use().await?))
}
