//! List queries: parameter coercion, filters and sort order.
//!
//! Raw parameters are never rejected. Anything unparsable falls back to the defaults and the
//! page size is always clamped into `[MIN_LIMIT, MAX_LIMIT]`.

use serde::{Deserialize, Serialize};

use crate::models::Post;

/// Page size used when the caller gives none (or garbage).
pub const DEFAULT_LIMIT: usize = 6;
/// Smallest page size a query may ask for.
pub const MIN_LIMIT: usize = 1;
/// Largest page size a query may ask for.
pub const MAX_LIMIT: usize = 50;

/// Order in which posts are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
        }
    }

    /// Unknown values sort newest-first.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("oldest") => SortOrder::Oldest,
            _ => SortOrder::Newest,
        }
    }

    pub fn sql_direction(&self) -> &'static str {
        match self {
            SortOrder::Newest => "DESC",
            SortOrder::Oldest => "ASC",
        }
    }
}

/// Category/tag restriction applied identically to the item and count queries.
///
/// `tags` is kept sorted and deduplicated so two filters selecting the same set compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ListFilter {
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl ListFilter {
    pub fn new<I, S>(category: Option<&str>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let mut tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Self { category, tags }
    }

    pub fn category(category: &str) -> Self {
        Self::new(Some(category), std::iter::empty::<&str>())
    }

    /// Build a filter from the `category` and comma-separated `tags` request parameters.
    pub fn from_params(category: Option<&str>, tags: Option<&str>) -> Self {
        Self::new(category, tags.unwrap_or_default().split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tags.is_empty()
    }

    /// Whether a post passes the filter. The category must be among the post's category titles
    /// and, when tags are given, at least one tag slug must match.
    pub fn matches(&self, post: &Post) -> bool {
        let category_ok = match &self.category {
            Some(category) => post.categories.iter().any(|c| &c.title == category),
            None => true,
        };
        let tags_ok =
            self.tags.is_empty() || post.tags.iter().any(|t| self.tags.contains(&t.slug));
        category_ok && tags_ok
    }

    /// Tags joined the way the `tags` request parameter carries them.
    pub fn tags_param(&self) -> String {
        self.tags.join(",")
    }
}

/// A request for one window of the post list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub offset: usize,
    pub limit: usize,
    pub sort: SortOrder,
    pub filter: ListFilter,
}

impl ListQuery {
    /// Build a query, clamping `limit` into the allowed range.
    pub fn new(offset: usize, limit: usize, sort: SortOrder, filter: ListFilter) -> Self {
        Self {
            offset,
            limit: limit.clamp(MIN_LIMIT, MAX_LIMIT),
            sort,
            filter,
        }
    }

    /// First page with default size, newest first, no filter.
    pub fn first_page() -> Self {
        Self::new(0, DEFAULT_LIMIT, SortOrder::Newest, ListFilter::default())
    }

    /// Build a query from untrusted request parameters.
    pub fn from_raw(
        limit: Option<&str>,
        offset: Option<&str>,
        sort: Option<&str>,
        filter: ListFilter,
    ) -> Self {
        Self::new(
            coerce_offset(offset),
            coerce_limit(limit),
            SortOrder::parse(sort),
            filter,
        )
    }

    /// Same filter, sort and page size starting at another offset.
    pub fn at_offset(&self, offset: usize) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Request parameters for `GET /api/posts`.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("sort", self.sort.as_str().to_string()),
        ];
        if let Some(category) = &self.filter.category {
            params.push(("category", category.clone()));
        }
        if !self.filter.tags.is_empty() {
            params.push(("tags", self.filter.tags_param()));
        }
        params
    }
}

/// Parse a numeric parameter. Empty and non-numeric input is `None`; fractions truncate.
fn parse_number(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    match raw.parse::<f64>() {
        // `as` saturates for out-of-range floats
        Ok(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

/// Effective page size for a raw `limit` parameter, always within `[MIN_LIMIT, MAX_LIMIT]`.
pub fn coerce_limit(raw: Option<&str>) -> usize {
    let limit = parse_number(raw).unwrap_or(DEFAULT_LIMIT as i64);
    limit.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as usize
}

/// Effective offset for a raw `offset` parameter, never negative.
pub fn coerce_offset(raw: Option<&str>) -> usize {
    let offset = parse_number(raw).unwrap_or(0).max(0);
    usize::try_from(offset).unwrap_or(usize::MAX)
}
