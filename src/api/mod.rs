//! REST API module.
//!
//! Read-only routes serving posts, pages, taxonomy and site settings.

mod pages;
mod posts;
mod settings;
mod taxonomy;

pub use pages::*;
pub use posts::*;
pub use settings::*;
pub use taxonomy::*;

use axum::Json;

use crate::errors::AppError;

/// Handler result: JSON on success, `{ error, code }` with the error's status otherwise.
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Turn a missing document into a 404.
fn found<T>(value: Option<T>, what: &str) -> ApiResult<T> {
    value
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{} not found", what)))
}
