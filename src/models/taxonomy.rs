//! Category and tag aggregate views.

use serde::{Deserialize, Serialize};

/// Number of posts carrying a category title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub title: String,
    pub count: usize,
}

/// Number of posts carrying a tag slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub slug: String,
    pub title: String,
    pub count: usize,
}

/// A tag as shown in a filter bar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagSummary {
    pub title: String,
    pub slug: String,
}
