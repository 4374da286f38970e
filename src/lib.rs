//! Blog content backend
//!
//! Serves a CMS-driven blog from a SQLite replica of its content store: pages are resolved
//! block by block, and post listings are paginated with category and tag filters.

pub mod api;
pub mod config;
pub mod content;
pub mod db;
pub mod errors;
pub mod listing;
pub mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use content::{HtmlRenderer, PageAssembler};
use db::ContentStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub assembler: Arc<PageAssembler<HtmlRenderer>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>, config: Config) -> Self {
        let assembler = Arc::new(PageAssembler::new(store.clone(), HtmlRenderer::new()));
        Self {
            store,
            assembler,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = if state.config.cors_allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let api_routes = Router::new()
        // Posts
        .route("/posts", get(api::list_posts))
        .route("/posts/slugs", get(api::list_post_slugs))
        .route("/posts/{slug}", get(api::get_post))
        // Pages
        .route("/pages/home", get(api::get_home_page))
        .route("/pages/{slug}", get(api::get_landing_page))
        // Taxonomy
        .route("/categories", get(api::list_categories))
        .route("/categories/unique", get(api::list_unique_categories))
        .route("/tags", get(api::list_tags))
        // Settings
        .route("/site-settings", get(api::get_site_settings));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
