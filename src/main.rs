//! Blog content backend server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blog_backend::config::{Config, LogFormat};
use blog_backend::db::{self, Repository};
use blog_backend::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting blog backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;

    if let Some(import_path) = &config.import_path {
        db::import_ndjson_file(&pool, import_path).await?;
    }

    let repo = Repository::new(pool);
    match repo.imported_at().await? {
        Some(at) => tracing::info!("Serving content imported at {}", at),
        None => tracing::warn!("No content imported yet. Set BLOG_IMPORT_PATH to load an export"),
    }

    // Create application state
    let state = AppState::new(Arc::new(repo), config.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
