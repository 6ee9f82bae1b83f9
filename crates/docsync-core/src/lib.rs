//! docsync core library
//!
//! Converts markdown documents to and from a block tree and keeps a remote
//! block container in step with a local file.
//!
//! - `blocks`: the document model (blocks and rich-text runs)
//! - `markdown`: parser, inline parser, serializer and front matter
//! - `store`: the remote block store contract, its JSON shape and an
//!   in-memory implementation
//! - `sync`: content replacement, pull, configuration and progress events

pub mod blocks;
pub mod markdown;
pub mod store;
pub mod sync;

pub use blocks::{Block, Document, HeadingLevel, RichTextRun};
pub use markdown::{format, parse, to_markdown};
pub use store::{BlockStore, MemoryStore, StoreError};
pub use sync::{replace_content, DeletePolicy, ReplaceOptions, ReplaceReport, SyncConfig};
