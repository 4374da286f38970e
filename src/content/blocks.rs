//! Typed content blocks.
//!
//! Blocks arrive as raw JSON tagged by `_type`. Each one is parsed on its own so a block
//! with an unknown tag (or a payload that does not fit its tag) is dropped without
//! affecting its neighbours.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listing::{ListPage, SortOrder};
use crate::models::TagSummary;

/// Layout width of a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionVariant {
    #[default]
    Default,
    Narrow,
    FullWidth,
}

impl SectionVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionVariant::Default => "default",
            SectionVariant::Narrow => "narrow",
            SectionVariant::FullWidth => "fullWidth",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionBackground {
    #[default]
    None,
    Gray,
}

impl SectionBackground {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionBackground::None => "none",
            SectionBackground::Gray => "gray",
        }
    }
}

/// Presentation fields every block may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFields {
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub section_variant: SectionVariant,
    #[serde(default)]
    pub section_background: SectionBackground,
}

/// A link whose target has already been resolved to an href.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub open_in_new_tab: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeroBlock {
    #[serde(default)]
    pub title: String,
    /// Portable text
    #[serde(default)]
    pub text: Vec<Value>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<Link>,
    #[serde(flatten)]
    pub section: SectionFields,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichTextBlock {
    #[serde(default)]
    pub body: Vec<Value>,
    #[serde(flatten)]
    pub section: SectionFields,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageTeaserBlock {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<Link>,
    #[serde(flatten)]
    pub section: SectionFields,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Teaser {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeaserListBlock {
    #[serde(default)]
    pub items: Vec<Teaser>,
    #[serde(flatten)]
    pub section: SectionFields,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccordionItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccordionBlock {
    #[serde(default)]
    pub items: Vec<AccordionItem>,
    #[serde(flatten)]
    pub section: SectionFields,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogListMode {
    #[default]
    #[serde(alias = "auto")]
    Latest,
    Manual,
}

fn default_blog_list_limit() -> usize {
    3
}

/// A short list of posts: the latest ones, or a hand-picked selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlogListBlock {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mode: BlogListMode,
    #[serde(default = "default_blog_list_limit")]
    pub limit: usize,
    /// Post ids, used in manual mode
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(flatten)]
    pub section: SectionFields,
    /// Filled in during page assembly
    #[serde(skip)]
    pub page: Option<ListPage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    #[default]
    All,
    Selected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoreLinkMode {
    #[default]
    Client,
    Link,
}

fn default_posts_limit() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn default_more_link_label() -> String {
    "Load more posts".to_string()
}

/// A paginated, tag-filterable post list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsBlock {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_posts_limit")]
    pub limit: usize,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default = "default_true")]
    pub show_tags: bool,
    #[serde(default)]
    pub tag_source: TagSource,
    /// Preselected tags when `tag_source` is `Selected`
    #[serde(default)]
    pub tags: Vec<TagSummary>,
    #[serde(default)]
    pub more_link_mode: MoreLinkMode,
    #[serde(default = "default_more_link_label")]
    pub more_link_label: String,
    #[serde(default)]
    pub more_href: Option<String>,
    #[serde(flatten)]
    pub section: SectionFields,
    /// First page, filled in during page assembly
    #[serde(skip)]
    pub page: Option<ListPage>,
    /// Tags offered in the filter bar, filled in during page assembly
    #[serde(skip)]
    pub available_tags: Vec<TagSummary>,
}

impl PostsBlock {
    /// Tag slugs the first page is restricted to.
    pub fn preselected_slugs(&self) -> Vec<String> {
        match self.tag_source {
            TagSource::Selected => self.tags.iter().map(|t| t.slug.clone()).collect(),
            TagSource::All => Vec::new(),
        }
    }
}

/// Every block type the resolver knows, tagged by `_type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "_type")]
pub enum ContentBlock {
    #[serde(rename = "hero")]
    Hero(HeroBlock),
    #[serde(rename = "richText")]
    RichText(RichTextBlock),
    #[serde(rename = "imageTeaser")]
    ImageTeaser(ImageTeaserBlock),
    #[serde(rename = "teaserList")]
    TeaserList(TeaserListBlock),
    #[serde(rename = "accordion")]
    Accordion(AccordionBlock),
    #[serde(rename = "blogList")]
    BlogList(BlogListBlock),
    #[serde(rename = "posts", alias = "postsList", alias = "postsModule")]
    Posts(PostsBlock),
}

/// Tags accepted by [`ContentBlock`], aliases included.
pub const KNOWN_BLOCK_TYPES: &[&str] = &[
    "hero",
    "richText",
    "imageTeaser",
    "teaserList",
    "accordion",
    "blogList",
    "posts",
    "postsList",
    "postsModule",
];

impl ContentBlock {
    /// Canonical tag of this block.
    pub fn type_name(&self) -> &'static str {
        match self {
            ContentBlock::Hero(_) => "hero",
            ContentBlock::RichText(_) => "richText",
            ContentBlock::ImageTeaser(_) => "imageTeaser",
            ContentBlock::TeaserList(_) => "teaserList",
            ContentBlock::Accordion(_) => "accordion",
            ContentBlock::BlogList(_) => "blogList",
            ContentBlock::Posts(_) => "posts",
        }
    }

    pub fn section(&self) -> &SectionFields {
        match self {
            ContentBlock::Hero(b) => &b.section,
            ContentBlock::RichText(b) => &b.section,
            ContentBlock::ImageTeaser(b) => &b.section,
            ContentBlock::TeaserList(b) => &b.section,
            ContentBlock::Accordion(b) => &b.section,
            ContentBlock::BlogList(b) => &b.section,
            ContentBlock::Posts(b) => &b.section,
        }
    }
}

/// A parsed block with its positional key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedBlock {
    pub key: String,
    pub block: ContentBlock,
}

/// Parse the block at `index` of a list. `None` for unknown or malformed blocks.
pub fn parse_block(raw: &Value, index: usize) -> Option<KeyedBlock> {
    let Some(block_type) = raw.get("_type").and_then(Value::as_str).filter(|t| !t.is_empty()) else {
        tracing::warn!("Skipping block {} without a type", index);
        return None;
    };

    if !KNOWN_BLOCK_TYPES.contains(&block_type) {
        tracing::debug!("Skipping block {} of unknown type {:?}", index, block_type);
        return None;
    }

    let block = match ContentBlock::deserialize(raw) {
        Ok(block) => block,
        Err(e) => {
            tracing::warn!("Skipping malformed {:?} block {}: {}", block_type, index, e);
            return None;
        }
    };

    let key = raw
        .get("_key")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| index.to_string());

    Some(KeyedBlock { key, block })
}

/// Parse a block list, keeping the original order. A missing list is empty.
pub fn parse_blocks(raw: Option<&[Value]>) -> Vec<KeyedBlock> {
    raw.unwrap_or_default()
        .iter()
        .enumerate()
        .filter_map(|(index, block)| parse_block(block, index))
        .collect()
}

/// Plain text of each paragraph in a portable-text array. Marks are dropped.
pub fn rich_text_paragraphs(blocks: &[Value]) -> Vec<String> {
    blocks
        .iter()
        .filter(|b| b.get("_type").and_then(Value::as_str) == Some("block"))
        .map(|b| {
            b.get("children")
                .and_then(Value::as_array)
                .map(|spans| {
                    spans
                        .iter()
                        .filter_map(|s| s.get("text").and_then(Value::as_str))
                        .collect::<String>()
                })
                .unwrap_or_default()
        })
        .filter(|text| !text.trim().is_empty())
        .collect()
}
