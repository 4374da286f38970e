//! Post models as returned by list and detail queries.

use serde::{Deserialize, Serialize};

/// Category reference projected onto a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    pub title: String,
}

/// Tag reference projected onto a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRef {
    pub slug: String,
    pub title: String,
}

/// Author reference projected onto a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    pub name: String,
}

/// A post in list views. `id` is the identity used for deduplication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Creation timestamp, the ordering fallback when `published_at` is absent
    #[serde(rename = "_createdAt", default)]
    pub created_at: String,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

impl Post {
    /// The timestamp posts are ordered by.
    pub fn sort_key(&self) -> &str {
        self.published_at.as_deref().unwrap_or(&self.created_at)
    }
}

/// A single post with its rich-text body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    /// Portable-text blocks
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(rename = "_updatedAt", default)]
    pub updated_at: String,
}
