//! Keeping a remote container in step with a local document
//!
//! Push goes through [`replace_content`], which swaps the container's
//! top-level blocks wholesale. Pull goes through [`fetch_tree`].

mod config;
mod events;
mod fetch;
mod log_scope;
mod replace;
mod retry;

pub use config::{ConfigError, DeletePolicy, SyncConfig};
pub use events::ReplaceEvent;
pub use fetch::{fetch_tree, pull_markdown};
pub use log_scope::LogScope;
pub use replace::{
    replace_content, replace_with_markdown, ReplaceError, ReplaceOptions, ReplaceReport,
};
pub use retry::{with_retry, IsRetryable, RetryConfig};
