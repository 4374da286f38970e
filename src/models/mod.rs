//! Data models for the blog content API.
//!
//! Field names follow the content store's JSON shape so documents round-trip without adapters.

mod page;
mod post;
mod settings;
mod taxonomy;

pub use page::*;
pub use post::*;
pub use settings::*;
pub use taxonomy::*;
