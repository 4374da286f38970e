//! Configuration module for the blog backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite replica of the content store
    pub db_path: PathBuf,
    /// Optional NDJSON content export imported at startup
    pub import_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Allow any origin to call the API
    pub cors_allow_any: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("BLOG_DB_PATH")
            .unwrap_or_else(|_| "./data/content.sqlite".to_string())
            .into();

        let import_path = env::var("BLOG_IMPORT_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let raw_bind = env::var("BLOG_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = raw_bind
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid BLOG_BIND_ADDR {raw_bind:?}: {e}")))?;

        let log_level = env::var("BLOG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = env::var("BLOG_LOG_FORMAT")
            .map(|s| LogFormat::parse(&s))
            .unwrap_or(LogFormat::Pretty);

        let cors_allow_any = env::var("BLOG_CORS_ALLOW_ANY")
            .map(|s| !matches!(s.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Ok(Self {
            db_path,
            import_path,
            bind_addr,
            log_level,
            log_format,
            cors_allow_any,
        })
    }
}
