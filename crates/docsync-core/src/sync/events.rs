//! Replacement progress events

use serde::Serialize;

/// Progress reported while a container's content is replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReplaceEvent {
    /// Count phase finished
    Counted { total: usize },
    /// A delete batch finished
    Deleted { deleted: usize, total: usize },
    /// A block kept failing and was left in place (lenient policy)
    DeleteSkipped { block_id: String },
    /// An append chunk was accepted (1-based)
    Appended { chunk: usize, chunks: usize },
}
