//! HTML fragments for resolved blocks.

use super::blocks::{
    rich_text_paragraphs, AccordionBlock, BlogListBlock, HeroBlock, ImageTeaserBlock, Link,
    MoreLinkMode, PostsBlock, RichTextBlock, SectionFields, TeaserListBlock,
};
use super::resolver::BlockRenderer;
use crate::listing::ListPage;
use crate::models::Post;

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Renders blocks as escaped HTML fragments.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    /// Prefix for post links
    post_base: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::with_post_base("/post")
    }

    pub fn with_post_base(post_base: impl Into<String>) -> Self {
        Self {
            post_base: post_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn post_href(&self, post: &Post) -> String {
        format!("{}/{}", self.post_base, post.slug)
    }

    fn section(&self, class: &str, section: &SectionFields, inner: String) -> String {
        let title = section
            .section_title
            .as_deref()
            .map(|t| format!("<h2 class=\"section-title\">{}</h2>", html_escape(t)))
            .unwrap_or_default();
        format!(
            "<section class=\"{} section-{} bg-{}\">{}{}</section>",
            class,
            section.section_variant.as_str(),
            section.section_background.as_str(),
            title,
            inner
        )
    }

    fn post_card(&self, post: &Post) -> String {
        let mut html = format!(
            "<article class=\"post-card\" data-id=\"{}\">",
            html_escape(&post.id)
        );
        if let Some(image) = &post.main_image {
            html.push_str(&image_tag(image, &post.title));
        }
        html.push_str(&format!(
            "<h3><a href=\"{}\">{}</a></h3>",
            html_escape(&self.post_href(post)),
            html_escape(&post.title)
        ));
        if let Some(excerpt) = &post.excerpt {
            html.push_str(&format!("<p>{}</p>", html_escape(excerpt)));
        }
        if !post.categories.is_empty() {
            html.push_str("<ul class=\"categories\">");
            for category in &post.categories {
                html.push_str(&format!("<li>{}</li>", html_escape(&category.title)));
            }
            html.push_str("</ul>");
        }
        html.push_str("</article>");
        html
    }

    fn post_grid(&self, page: Option<&ListPage>) -> String {
        let items = page.map(|p| p.items.as_slice()).unwrap_or_default();
        let cards: String = items.iter().map(|p| self.post_card(p)).collect();
        format!("<div class=\"post-grid\">{}</div>", cards)
    }
}

fn paragraphs(blocks: &[serde_json::Value]) -> String {
    rich_text_paragraphs(blocks)
        .iter()
        .map(|p| format!("<p>{}</p>", html_escape(p)))
        .collect()
}

fn image_tag(src: &str, alt: &str) -> String {
    format!(
        "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
        html_escape(src),
        html_escape(alt)
    )
}

fn link_tag(link: &Link) -> String {
    let aria = link
        .aria_label
        .as_deref()
        .map(|a| format!(" aria-label=\"{}\"", html_escape(a)))
        .unwrap_or_default();
    let target = if link.open_in_new_tab {
        " target=\"_blank\" rel=\"noopener noreferrer\""
    } else {
        ""
    };
    format!(
        "<a href=\"{}\"{}{}>{}</a>",
        html_escape(&link.href),
        aria,
        target,
        html_escape(&link.label)
    )
}

fn heading(level: u8, text: Option<&str>) -> String {
    match text.filter(|t| !t.is_empty()) {
        Some(text) => format!("<h{level}>{}</h{level}>", html_escape(text)),
        None => String::new(),
    }
}

impl BlockRenderer for HtmlRenderer {
    type Output = String;

    fn hero(&self, block: &HeroBlock) -> String {
        let mut inner = heading(1, Some(&block.title));
        inner.push_str(&paragraphs(&block.text));
        if let Some(image) = &block.image {
            inner.push_str(&image_tag(image, &block.title));
        }
        if let Some(link) = &block.link {
            inner.push_str(&link_tag(link));
        }
        self.section("hero", &block.section, inner)
    }

    fn rich_text(&self, block: &RichTextBlock) -> String {
        self.section("rich-text", &block.section, paragraphs(&block.body))
    }

    fn image_teaser(&self, block: &ImageTeaserBlock) -> String {
        let mut inner = String::new();
        if let Some(image) = &block.image {
            inner.push_str(&image_tag(image, &block.title));
        }
        inner.push_str(&heading(3, Some(&block.title)));
        if let Some(description) = &block.description {
            inner.push_str(&format!("<p>{}</p>", html_escape(description)));
        }
        if let Some(link) = &block.link {
            inner.push_str(&link_tag(link));
        }
        self.section("image-teaser", &block.section, inner)
    }

    fn teaser_list(&self, block: &TeaserListBlock) -> String {
        let mut inner = String::from("<ul class=\"teasers\">");
        for teaser in &block.items {
            inner.push_str("<li>");
            if let Some(image) = &teaser.image {
                inner.push_str(&image_tag(image, &teaser.title));
            }
            inner.push_str(&heading(3, Some(&teaser.title)));
            if let Some(summary) = &teaser.summary {
                inner.push_str(&format!("<p>{}</p>", html_escape(summary)));
            }
            if let Some(link) = &teaser.link {
                inner.push_str(&link_tag(link));
            }
            inner.push_str("</li>");
        }
        inner.push_str("</ul>");
        self.section("teaser-list", &block.section, inner)
    }

    fn accordion(&self, block: &AccordionBlock) -> String {
        let inner: String = block
            .items
            .iter()
            .map(|item| {
                format!(
                    "<details><summary>{}</summary>{}</details>",
                    html_escape(&item.title),
                    paragraphs(&item.content)
                )
            })
            .collect();
        self.section("accordion", &block.section, inner)
    }

    fn blog_list(&self, block: &BlogListBlock) -> String {
        let mut inner = heading(2, block.title.as_deref());
        inner.push_str(&self.post_grid(block.page.as_ref()));
        self.section("blog-list", &block.section, inner)
    }

    fn posts(&self, block: &PostsBlock) -> String {
        let page = block.page.as_ref();
        let total = page.map(|p| p.total).unwrap_or(0);
        let loaded = page.map(|p| p.offset + p.items.len()).unwrap_or(0);
        let selected: Vec<String> = block.preselected_slugs();

        let mut inner = format!(
            "<div class=\"posts-list\" data-limit=\"{}\" data-sort=\"{}\" data-total=\"{}\" data-tags=\"{}\">",
            page.map(|p| p.limit).unwrap_or(block.limit),
            block.sort.as_str(),
            total,
            html_escape(&selected.join(","))
        );
        inner.push_str(&heading(2, block.title.as_deref()));

        if block.show_tags && !block.available_tags.is_empty() {
            inner.push_str("<nav class=\"tag-filter\">");
            for tag in &block.available_tags {
                let active = if selected.contains(&tag.slug) { " active" } else { "" };
                inner.push_str(&format!(
                    "<button class=\"tag{}\" data-tag=\"{}\">{}</button>",
                    active,
                    html_escape(&tag.slug),
                    html_escape(&tag.title)
                ));
            }
            inner.push_str("</nav>");
        }

        inner.push_str(&self.post_grid(page));

        match block.more_link_mode {
            MoreLinkMode::Client if loaded < total => inner.push_str(&format!(
                "<button class=\"load-more\" data-offset=\"{}\">{}</button>",
                loaded,
                html_escape(&block.more_link_label)
            )),
            MoreLinkMode::Client => {}
            // link mode points elsewhere, so it shows regardless of what is left
            MoreLinkMode::Link => {
                if let Some(href) = block.more_href.as_deref().filter(|h| !h.is_empty()) {
                    let label = if block.more_link_label.is_empty() {
                        "View all posts"
                    } else {
                        block.more_link_label.as_str()
                    };
                    inner.push_str(&format!(
                        "<a class=\"more\" href=\"{}\">{}</a>",
                        html_escape(href),
                        html_escape(label)
                    ));
                }
            }
        }
        inner.push_str("</div>");
        self.section("posts", &block.section, inner)
    }
}
