//! Content replacement protocol
//!
//! Swaps the top-level content of a remote container in three phases:
//! count the existing blocks, delete them in small paced batches, then
//! append the new sequence in chunks the store accepts.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn, Instrument};

use super::config::{DeletePolicy, SyncConfig};
use super::events::ReplaceEvent;
use super::log_scope::LogScope;
use super::retry::with_retry;
use crate::blocks::Block;
use crate::markdown::parse;
use crate::store::{BlockStore, ChildPage, RemoteBlock, StoreError};

#[derive(Debug, Error)]
pub enum ReplaceError {
    /// Listing is needed to know what to delete, so it is never skipped
    #[error("failed to list children of {container_id}: {source}")]
    List {
        container_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete block {block_id}: {source}")]
    Delete {
        block_id: String,
        #[source]
        source: StoreError,
    },

    /// The container now holds the first `appended_chunks` chunks only
    #[error("append of chunk {chunk} failed after {appended_chunks} chunk(s) were appended: {source}")]
    Append {
        chunk: usize,
        appended_chunks: usize,
        #[source]
        source: StoreError,
    },
}

/// Outcome of a successful replacement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceReport {
    /// Top-level blocks found before deleting
    pub total: usize,
    pub deleted: usize,
    /// Blocks left in place under the lenient policy
    pub skipped: usize,
    /// Top-level blocks appended
    pub appended: usize,
}

pub struct ReplaceOptions {
    /// Tunables, including the delete policy
    pub config: SyncConfig,
    progress: Option<mpsc::UnboundedSender<ReplaceEvent>>,
    scope: Option<Arc<LogScope>>,
}

impl ReplaceOptions {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            progress: None,
            scope: None,
        }
    }

    pub fn with_policy(mut self, policy: DeletePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Send progress events to `tx` as the run advances
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ReplaceEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Run inside a caller-provided logging scope instead of a fresh one
    pub fn with_scope(mut self, scope: Arc<LogScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    fn emit(&self, event: ReplaceEvent) {
        debug!(?event, "Replace progress");
        if let Some(tx) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

/// Replace everything under `container_id` with `blocks`
pub async fn replace_content<S>(
    store: &S,
    container_id: &str,
    blocks: &[Block],
    options: &ReplaceOptions,
) -> Result<ReplaceReport, ReplaceError>
where
    S: BlockStore + ?Sized,
{
    let scope = options
        .scope
        .clone()
        .unwrap_or_else(|| Arc::new(LogScope::for_container(container_id)));
    let span = scope.span().clone();

    run(store, container_id, blocks, options, &scope)
        .instrument(span)
        .await
}

/// Parse `markdown` and replace the container's content with the result
pub async fn replace_with_markdown<S>(
    store: &S,
    container_id: &str,
    markdown: &str,
    options: &ReplaceOptions,
) -> Result<ReplaceReport, ReplaceError>
where
    S: BlockStore + ?Sized,
{
    let blocks = parse(markdown);
    replace_content(store, container_id, &blocks, options).await
}

async fn run<S>(
    store: &S,
    container_id: &str,
    blocks: &[Block],
    options: &ReplaceOptions,
    scope: &LogScope,
) -> Result<ReplaceReport, ReplaceError>
where
    S: BlockStore + ?Sized,
{
    let total = count_blocks(store, container_id).await?;
    info!(total, policy = ?options.config.policy, "Replacing container content");
    options.emit(ReplaceEvent::Counted { total });

    let mut report = ReplaceReport {
        total,
        ..ReplaceReport::default()
    };

    {
        let _quiet = scope.quiet();
        delete_all(store, container_id, options, scope, &mut report).await?;
    }
    info!(
        deleted = report.deleted,
        skipped = report.skipped,
        "Existing content removed"
    );

    report.appended = append_all(store, container_id, blocks, options).await?;
    info!(appended = report.appended, "Container content replaced");

    Ok(report)
}

async fn list_page<S>(
    store: &S,
    container_id: &str,
    cursor: Option<&str>,
) -> Result<ChildPage, ReplaceError>
where
    S: BlockStore + ?Sized,
{
    store
        .list_children(container_id, cursor)
        .await
        .map_err(|source| ReplaceError::List {
            container_id: container_id.to_string(),
            source,
        })
}

async fn count_blocks<S>(store: &S, container_id: &str) -> Result<usize, ReplaceError>
where
    S: BlockStore + ?Sized,
{
    let mut total = 0;
    let mut cursor: Option<String> = None;

    loop {
        let page = list_page(store, container_id, cursor.as_deref()).await?;
        total += page.items.len();
        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => return Ok(total),
        }
    }
}

async fn delete_all<S>(
    store: &S,
    container_id: &str,
    options: &ReplaceOptions,
    scope: &LogScope,
    report: &mut ReplaceReport,
) -> Result<(), ReplaceError>
where
    S: BlockStore + ?Sized,
{
    let config = &options.config;
    let batch_size = config.delete_batch_size.max(1);
    let pause = config.batch_pause();
    let mut cursor: Option<String> = None;

    loop {
        let page = list_page(store, container_id, cursor.as_deref()).await?;

        for batch in page.items.chunks(batch_size) {
            let results = join_all(
                batch
                    .iter()
                    .map(|item| delete_with_retry(store, item, config, scope)),
            )
            .await;

            for (item, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => report.deleted += 1,
                    Err(source) => match options.config.policy {
                        DeletePolicy::Strict => {
                            return Err(ReplaceError::Delete {
                                block_id: item.id.clone(),
                                source,
                            });
                        }
                        DeletePolicy::Lenient => {
                            warn!(block_id = %item.id, error = %source, "Skipping block that could not be deleted");
                            report.skipped += 1;
                            options.emit(ReplaceEvent::DeleteSkipped {
                                block_id: item.id.clone(),
                            });
                        }
                    },
                }
            }

            options.emit(ReplaceEvent::Deleted {
                deleted: report.deleted,
                total: report.total,
            });

            if !pause.is_zero() {
                sleep(pause).await;
            }
        }

        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => return Ok(()),
        }
    }
}

async fn delete_with_retry<S>(
    store: &S,
    item: &RemoteBlock,
    config: &SyncConfig,
    scope: &LogScope,
) -> Result<(), StoreError>
where
    S: BlockStore + ?Sized,
{
    let block_id = item.id.as_str();
    with_retry(
        config.retry(),
        || store.delete_block(block_id),
        |attempt, err| scope.retry_notice(block_id, attempt, err),
    )
    .await
}

async fn append_all<S>(
    store: &S,
    container_id: &str,
    blocks: &[Block],
    options: &ReplaceOptions,
) -> Result<usize, ReplaceError>
where
    S: BlockStore + ?Sized,
{
    let chunk_size = options.config.chunk_size();
    let chunks = blocks.len().div_ceil(chunk_size);
    let mut appended = 0;

    for (index, chunk) in blocks.chunks(chunk_size).enumerate() {
        store
            .append_children(container_id, chunk)
            .await
            .map_err(|source| ReplaceError::Append {
                chunk: index + 1,
                appended_chunks: index,
                source,
            })?;

        appended += chunk.len();
        debug!(chunk = index + 1, chunks, size = chunk.len(), "Appended chunk");
        options.emit(ReplaceEvent::Appended {
            chunk: index + 1,
            chunks,
        });
    }

    Ok(appended)
}
