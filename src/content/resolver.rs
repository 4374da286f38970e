//! Block dispatch: every known block type maps to one renderer method.

use serde::Serialize;
use serde_json::Value;

use super::blocks::{
    parse_block, parse_blocks, AccordionBlock, BlogListBlock, ContentBlock, HeroBlock,
    ImageTeaserBlock, KeyedBlock, PostsBlock, RichTextBlock, TeaserListBlock,
};

/// Renders each block type. Adding a block type means adding a method here, so every
/// renderer has to handle it.
pub trait BlockRenderer {
    type Output;

    fn hero(&self, block: &HeroBlock) -> Self::Output;
    fn rich_text(&self, block: &RichTextBlock) -> Self::Output;
    fn image_teaser(&self, block: &ImageTeaserBlock) -> Self::Output;
    fn teaser_list(&self, block: &TeaserListBlock) -> Self::Output;
    fn accordion(&self, block: &AccordionBlock) -> Self::Output;
    fn blog_list(&self, block: &BlogListBlock) -> Self::Output;
    fn posts(&self, block: &PostsBlock) -> Self::Output;
}

/// Renderer output in its positional slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBlock<O> {
    pub key: String,
    pub block_type: &'static str,
    pub output: O,
}

pub fn render<R: BlockRenderer + ?Sized>(renderer: &R, block: &ContentBlock) -> R::Output {
    match block {
        ContentBlock::Hero(b) => renderer.hero(b),
        ContentBlock::RichText(b) => renderer.rich_text(b),
        ContentBlock::ImageTeaser(b) => renderer.image_teaser(b),
        ContentBlock::TeaserList(b) => renderer.teaser_list(b),
        ContentBlock::Accordion(b) => renderer.accordion(b),
        ContentBlock::BlogList(b) => renderer.blog_list(b),
        ContentBlock::Posts(b) => renderer.posts(b),
    }
}

pub fn resolve<R: BlockRenderer + ?Sized>(renderer: &R, block: &KeyedBlock) -> ResolvedBlock<R::Output> {
    ResolvedBlock {
        key: block.key.clone(),
        block_type: block.block.type_name(),
        output: render(renderer, &block.block),
    }
}

/// Resolve one raw block at `index`. Unknown types produce nothing.
pub fn resolve_value<R: BlockRenderer + ?Sized>(
    renderer: &R,
    raw: &Value,
    index: usize,
) -> Option<ResolvedBlock<R::Output>> {
    parse_block(raw, index).map(|block| resolve(renderer, &block))
}

/// Resolve a raw block list in order. A missing list resolves to nothing.
pub fn resolve_all<R: BlockRenderer + ?Sized>(
    renderer: &R,
    raw: Option<&[Value]>,
) -> Vec<ResolvedBlock<R::Output>> {
    parse_blocks(raw)
        .iter()
        .map(|block| resolve(renderer, block))
        .collect()
}
