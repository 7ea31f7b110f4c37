//! Markdown rendering with an embedded meta block.
//!
//! A "frosted" Markdown document carries one code block of YAML or JSON
//! metadata. This crate renders the document to HTML, pulls that block out of
//! the visible output and decodes it, falling back to the leading heading for
//! the document title.

pub mod codeblock;
pub mod interceptor;
pub mod meta;
pub mod parser;

pub use codeblock::{Language, MetaBlock};
pub use interceptor::{Block, BlockKind, Blocks, Intercepted, MetaPosition, RenderInterceptor};
pub use meta::{decode, Meta, MetaError};
pub use parser::{
    ContentParser, FrostedMarkdownParser, MarkdownOptions, ParseError, Parsed, PassThrough, Preset,
};
