//! Category and tag counts over the posts currently loaded.
//!
//! Counts only reflect fetched items, so a count never promises more posts than the list holds.

use std::collections::BTreeMap;

use crate::models::{CategoryCount, Post, TagCount};

/// Count posts per category title, alphabetically by title. Zero counts never appear.
pub fn derive_category_counts(posts: &[Post]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for post in posts {
        for category in &post.categories {
            *counts.entry(category.title.as_str()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(title, count)| CategoryCount {
            title: title.to_string(),
            count,
        })
        .collect()
}

/// Count posts per tag slug, alphabetically by title (slug breaks ties).
pub fn derive_tag_counts(posts: &[Post]) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, (&str, usize)> = BTreeMap::new();
    for post in posts {
        for tag in &post.tags {
            counts.entry(tag.slug.as_str()).or_insert((tag.title.as_str(), 0)).1 += 1;
        }
    }

    let mut tags: Vec<TagCount> = counts
        .into_iter()
        .map(|(slug, (title, count))| TagCount {
            slug: slug.to_string(),
            title: title.to_string(),
            count,
        })
        .collect();
    tags.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::testing::{post, with_categories, with_tags};

    #[test]
    fn test_category_counts_sorted() {
        let posts = vec![
            with_categories(post("p1", 1), &["A"]),
            with_categories(post("p2", 2), &["B", "A"]),
        ];

        assert_eq!(
            derive_category_counts(&posts),
            vec![
                CategoryCount {
                    title: "A".to_string(),
                    count: 2
                },
                CategoryCount {
                    title: "B".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_category_counts_empty() {
        assert!(derive_category_counts(&[]).is_empty());
        assert!(derive_category_counts(&[post("p1", 1)]).is_empty());
    }

    #[test]
    fn test_tag_counts() {
        let posts = vec![
            with_tags(post("p1", 1), &[("rust", "Rust"), ("async", "Async")]),
            with_tags(post("p2", 2), &[("rust", "Rust")]),
        ];

        let counts = derive_tag_counts(&posts);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].slug, "async");
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].slug, "rust");
        assert_eq!(counts[1].count, 2);
    }
}
