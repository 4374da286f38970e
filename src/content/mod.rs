//! Content tree resolution.
//!
//! Pages hold ordered lists of typed blocks. [`parse_blocks`] turns raw block JSON into
//! [`ContentBlock`]s (dropping unknown types), [`resolve_all`] dispatches each block to a
//! [`BlockRenderer`], and [`PageAssembler`] loads list data before rendering a whole page.

mod assembly;
mod blocks;
mod html;
mod resolver;

pub use assembly::*;
pub use blocks::*;
pub use html::*;
pub use resolver::*;
