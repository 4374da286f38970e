//! Page API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::content::AssembledPage;
use crate::errors::AppError;
use crate::AppState;

/// GET /api/pages/home - The home page with its blocks resolved.
pub async fn get_home_page(State(state): State<AppState>) -> ApiResult<AssembledPage<String>> {
    let page = state
        .store
        .home_page()
        .await?
        .ok_or_else(|| AppError::NotFound("Home page not found".to_string()))?;

    Ok(Json(state.assembler.assemble(&page).await))
}

/// GET /api/pages/{slug} - A landing page with its blocks resolved.
pub async fn get_landing_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<AssembledPage<String>> {
    let page = state
        .store
        .landing_page(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Page '{}' not found", slug)))?;

    tracing::debug!("Assembling landing page {} ({} sections)", slug, page.sections.len());
    Ok(Json(state.assembler.assemble(&page).await))
}
