//! Remote block store contract
//!
//! The store owns containers of top-level blocks. We only need three calls:
//! paginated child listing, single-block delete and chunked append. The HTTP
//! transport implementing this lives outside the core.

mod memory;
pub mod wire;

use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::Block;

pub use memory::{MemoryStore, StoreCall};

/// Maximum number of top-level blocks one append call accepts
pub const MAX_APPEND_CHUNK: usize = 100;

/// Errors reported by a block store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The target was being mutated concurrently; safe to retry
    #[error("conflict while mutating block {block_id}")]
    Conflict { block_id: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("rate limited by store")]
    RateLimited,

    #[error("store request failed: {0}")]
    Other(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// A block as listed by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBlock {
    /// Store-assigned opaque id
    pub id: String,
    pub has_children: bool,
    /// `None` when the store returned a block type we don't model
    pub block: Option<Block>,
}

/// One page of a child listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildPage {
    pub items: Vec<RemoteBlock>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Operations the content replacement protocol consumes
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// List one page of direct children of a container or block
    async fn list_children(
        &self,
        container_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildPage, StoreError>;

    /// Delete a block; its subtree goes with it
    async fn delete_block(&self, block_id: &str) -> Result<(), StoreError>;

    /// Append at most [`MAX_APPEND_CHUNK`] top-level blocks, in order
    async fn append_children(&self, container_id: &str, children: &[Block])
        -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let conflict = StoreError::Conflict {
            block_id: "b1".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!StoreError::Other("boom".into()).is_conflict());
        assert!(!StoreError::RateLimited.is_conflict());
        assert_eq!(conflict.to_string(), "conflict while mutating block b1");
    }
}
