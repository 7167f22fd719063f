//! Content module - handles documents, front-matter and markdown rendering

mod blocks;
mod document;
mod frontmatter;
pub mod loader;
mod markdown;

pub use blocks::{Alignment, Block, Blocks, List, ListItem, Table};
pub use document::{Document, DocumentSummary};
pub use frontmatter::{FrontMatter, DELIMITER};
pub use markdown::{MarkdownRenderer, RenderedBlocks, RenderedBody, TocEntry};
