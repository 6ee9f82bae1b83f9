//! Markdown <-> block conversion
//!
//! - `parser` turns document text into a block forest
//! - `inline` turns one line into rich-text runs
//! - `writer` serializes blocks back to text and normalizes spacing
//! - `front_matter` splits and renders the YAML metadata header

mod front_matter;
mod inline;
mod parser;
mod writer;

pub use front_matter::{render_front_matter, split_front_matter, FrontMatter, FrontMatterError};
pub use inline::parse_inline;
pub use parser::{parse, DEFAULT_CODE_LANGUAGE};
pub use writer::{format, normalize, rich_text_to_markdown, serialize, to_markdown};
