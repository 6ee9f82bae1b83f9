//! In-memory block store
//!
//! Behaves like the remote store for listing, cascading delete and append,
//! and can be scripted to return conflicts or hard failures. Records every
//! call so tests can check ordering and concurrency.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BlockStore, ChildPage, RemoteBlock, StoreError, MAX_APPEND_CHUNK};
use crate::blocks::Block;

const DEFAULT_PAGE_SIZE: usize = 100;

/// A call received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List {
        container_id: String,
        cursor: Option<String>,
    },
    Delete {
        block_id: String,
    },
    Append {
        container_id: String,
        count: usize,
    },
}

#[derive(Default)]
struct State {
    /// Parent id -> ordered child ids
    children: HashMap<String, Vec<String>>,
    /// Block id -> block without its children
    blocks: HashMap<String, Block>,
    next_id: usize,
    /// Block id -> conflicts still to report
    conflicts: HashMap<String, u32>,
    failures: HashSet<String>,
    /// Containers whose listing fails
    list_failures: HashSet<String>,
    /// Append calls fail starting at this call index
    fail_appends_from: Option<usize>,
    append_calls: usize,
    calls: Vec<StoreCall>,
}

impl State {
    fn insert(&mut self, parent_id: &str, block: &Block) -> String {
        self.next_id += 1;
        let id = format!("blk-{:04}", self.next_id);

        let mut shallow = block.clone();
        if let Some(children) = shallow.children_mut() {
            children.clear();
        }
        self.blocks.insert(id.clone(), shallow);
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(id.clone());

        for child in block.children() {
            self.insert(&id, child);
        }
        id
    }

    fn remove_subtree(&mut self, id: &str) {
        self.blocks.remove(id);
        if let Some(child_ids) = self.children.remove(id) {
            for child_id in child_ids {
                self.remove_subtree(&child_id);
            }
        }
    }

    fn tree(&self, parent_id: &str) -> Vec<Block> {
        let Some(ids) = self.children.get(parent_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                let mut block = self.blocks.get(id)?.clone();
                if let Some(children) = block.children_mut() {
                    *children = self.tree(id);
                }
                Some(block)
            })
            .collect()
    }
}

/// Block store held in memory
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
    delete_latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
            delete_latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Number of items per listing page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Simulated time each delete call takes
    pub fn with_delete_latency(mut self, latency: Duration) -> Self {
        self.delete_latency = latency;
        self
    }

    /// Store blocks under `container_id` without recording a call
    pub fn seed(&self, container_id: &str, blocks: &[Block]) -> Vec<String> {
        let mut state = self.state.lock();
        blocks
            .iter()
            .map(|block| state.insert(container_id, block))
            .collect()
    }

    /// Report a conflict the next `times` deletes of `block_id`
    pub fn inject_conflicts(&self, block_id: &str, times: u32) {
        self.state.lock().conflicts.insert(block_id.to_string(), times);
    }

    /// Fail every delete of `block_id` with a non-conflict error
    pub fn inject_failure(&self, block_id: &str) {
        self.state.lock().failures.insert(block_id.to_string());
    }

    /// Fail every listing of `container_id`
    pub fn inject_list_failure(&self, container_id: &str) {
        self.state
            .lock()
            .list_failures
            .insert(container_id.to_string());
    }

    /// Fail append calls from the `call_index`-th one (0-based) onward
    pub fn fail_appends_from(&self, call_index: usize) {
        self.state.lock().fail_appends_from = Some(call_index);
    }

    /// Current content of a container, children reattached
    pub fn blocks(&self, container_id: &str) -> Vec<Block> {
        self.state.lock().tree(container_id)
    }

    pub fn child_ids(&self, container_id: &str) -> Vec<String> {
        self.state
            .lock()
            .children
            .get(container_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Delete { block_id } => Some(block_id),
                _ => None,
            })
            .collect()
    }

    /// Highest number of delete calls that were running at once
    pub fn max_concurrent_deletes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn finish_delete(&self, block_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        if let Some(remaining) = state.conflicts.get_mut(block_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Conflict {
                    block_id: block_id.to_string(),
                });
            }
        }
        if state.failures.contains(block_id) {
            return Err(StoreError::Other(format!("cannot delete {}", block_id)));
        }
        if !state.blocks.contains_key(block_id) {
            return Err(StoreError::NotFound(block_id.to_string()));
        }

        for siblings in state.children.values_mut() {
            siblings.retain(|id| id != block_id);
        }
        state.remove_subtree(block_id);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn list_children(
        &self,
        container_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildPage, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::List {
            container_id: container_id.to_string(),
            cursor: cursor.map(str::to_string),
        });
        if state.list_failures.contains(container_id) {
            return Err(StoreError::RateLimited);
        }

        let ids = state.children.get(container_id).cloned().unwrap_or_default();
        let start = match cursor {
            Some(cursor) => ids
                .iter()
                .position(|id| id == cursor)
                .ok_or_else(|| StoreError::Other(format!("invalid cursor {}", cursor)))?,
            None => 0,
        };
        let end = (start + self.page_size).min(ids.len());

        let items = ids[start..end]
            .iter()
            .map(|id| RemoteBlock {
                id: id.clone(),
                has_children: state.children.get(id).is_some_and(|c| !c.is_empty()),
                block: state.blocks.get(id).cloned(),
            })
            .collect();

        Ok(ChildPage {
            items,
            has_more: end < ids.len(),
            next_cursor: ids.get(end).cloned(),
        })
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), StoreError> {
        self.state.lock().calls.push(StoreCall::Delete {
            block_id: block_id.to_string(),
        });

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delete_latency.is_zero() {
            tokio::time::sleep(self.delete_latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.finish_delete(block_id)
    }

    async fn append_children(
        &self,
        container_id: &str,
        children: &[Block],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Append {
            container_id: container_id.to_string(),
            count: children.len(),
        });

        let call_index = state.append_calls;
        state.append_calls += 1;
        if state.fail_appends_from.is_some_and(|from| call_index >= from) {
            return Err(StoreError::Other("append rejected".to_string()));
        }
        if children.len() > MAX_APPEND_CHUNK {
            return Err(StoreError::Other(format!(
                "too many children: {} > {}",
                children.len(),
                MAX_APPEND_CHUNK
            )));
        }

        for block in children {
            state.insert(container_id, block);
        }
        Ok(())
    }
}
