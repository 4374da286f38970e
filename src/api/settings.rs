//! Site settings endpoint.

use axum::extract::State;

use super::{found, ApiResult};
use crate::models::SiteSettings;
use crate::AppState;

/// GET /api/site-settings
pub async fn get_site_settings(State(state): State<AppState>) -> ApiResult<SiteSettings> {
    found(state.store.site_settings().await?, "Site settings")
}
