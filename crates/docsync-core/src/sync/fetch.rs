//! Pull direction: remote container back to a block forest

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::blocks::{Block, Document};
use crate::markdown::to_markdown;
use crate::store::{BlockStore, StoreError};

/// Read the full tree under `container_id`
///
/// Items of unsupported types are dropped together with their subtree.
pub async fn fetch_tree<S>(store: &S, container_id: &str) -> Result<Document, StoreError>
where
    S: BlockStore + ?Sized,
{
    fetch_level(store, container_id).await
}

/// Fetch a container and serialize it to a finished markdown document
pub async fn pull_markdown<S>(store: &S, container_id: &str) -> Result<String, StoreError>
where
    S: BlockStore + ?Sized,
{
    let blocks = fetch_tree(store, container_id).await?;
    Ok(to_markdown(&blocks))
}

fn fetch_level<'a, S>(
    store: &'a S,
    parent_id: &'a str,
) -> BoxFuture<'a, Result<Vec<Block>, StoreError>>
where
    S: BlockStore + ?Sized,
{
    async move {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = store.list_children(parent_id, cursor.as_deref()).await?;

            for item in page.items {
                let Some(mut block) = item.block else {
                    debug!(block_id = %item.id, "Dropping unsupported block");
                    continue;
                };
                if item.has_children {
                    if let Some(children) = block.children_mut() {
                        *children = fetch_level(store, &item.id).await?;
                    }
                }
                blocks.push(block);
            }

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blocks)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{format, parse};
    use crate::store::MemoryStore;

    const DOC: &str = "# Plan\n\nIntro with **bold**.\n\n1. one\n   - sub a\n   - sub b\n     - [ ] deep\n2. two\n- [x] done\n\n```sh\necho hi\n```";

    #[tokio::test]
    async fn test_fetch_tree_rebuilds_nesting_across_pages() {
        let store = MemoryStore::new().with_page_size(1);
        let blocks = parse(DOC);
        store.seed("page", &blocks);

        let fetched = fetch_tree(&store, "page").await.unwrap();
        assert_eq!(fetched, blocks);
    }

    #[tokio::test]
    async fn test_pull_markdown_matches_format() {
        let store = MemoryStore::new().with_page_size(2);
        store.seed("page", &parse(DOC));

        let markdown = pull_markdown(&store, "page").await.unwrap();
        assert_eq!(markdown, format(DOC));
    }

    #[tokio::test]
    async fn test_empty_container() {
        let store = MemoryStore::new();
        assert!(fetch_tree(&store, "empty").await.unwrap().is_empty());
        assert_eq!(pull_markdown(&store, "empty").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_listing_error_propagates() {
        let store = MemoryStore::new();
        store.inject_list_failure("page");
        assert_eq!(
            fetch_tree(&store, "page").await,
            Err(StoreError::RateLimited)
        );
    }
}
