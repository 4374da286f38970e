//! One window of the post list plus the filtered total.

use serde::Serialize;

use crate::models::Post;

/// The result of a list query.
///
/// `offset + items.len() <= total` holds for every non-empty page built through
/// [`ListPage::new`]. An empty window past the end keeps the upstream total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub items: Vec<Post>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl ListPage {
    pub fn new(items: Vec<Post>, total: usize, offset: usize, limit: usize) -> Self {
        let seen = offset.saturating_add(items.len());
        let total = if !items.is_empty() && total < seen {
            tracing::warn!(
                "List total {} is smaller than offset {} + {} items; raising it",
                total,
                offset,
                items.len()
            );
            seen
        } else {
            total
        };

        Self {
            items,
            total,
            offset,
            limit,
        }
    }

    pub fn empty(limit: usize) -> Self {
        Self::new(Vec::new(), 0, 0, limit)
    }

    /// Recomputed from the window, never taken from upstream.
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.items.len()) < self.total
    }
}
