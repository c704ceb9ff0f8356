//! Block relationship queries.
//!
//! Blocks are stored as directed edges, but the exclusion rule is
//! bidirectional: if either direction exists between a viewer and an author,
//! that author's content is hidden from the viewer. Listing composition never
//! checks blocks per item; it materializes the exclusion set once per
//! request.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::store::ContentStore;

#[derive(Clone)]
pub struct BlockStore {
    store: Arc<dyn ContentStore>,
}

impl BlockStore {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Has `viewer` blocked `target`?
    pub async fn has_block(&self, viewer_id: Uuid, target_id: Uuid) -> Result<bool> {
        self.store.block_exists(viewer_id, target_id).await
    }

    /// Has `other` blocked `viewer`?
    pub async fn is_blocked_by(&self, viewer_id: Uuid, other_id: Uuid) -> Result<bool> {
        self.store.block_exists(other_id, viewer_id).await
    }

    /// Existence test over both directions. Never assumes a canonical
    /// direction for the edge.
    pub async fn any_block_exists(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let (forward, reverse) =
            tokio::join!(self.store.block_exists(a, b), self.store.block_exists(b, a));
        Ok(forward? || reverse?)
    }

    /// Union of both directional edge sets: every author whose content must
    /// be excluded from this viewer's listings.
    pub async fn excluded_authors(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>> {
        let (outgoing, incoming) = tokio::join!(
            self.store.blocked_targets(viewer_id),
            self.store.blocking_sources(viewer_id)
        );
        let mut excluded: HashSet<Uuid> = outgoing?.into_iter().collect();
        excluded.extend(incoming?);
        Ok(excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn single_directed_edge_excludes_both_ways() {
        let store = Arc::new(MemoryStore::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.add_block(a, b).await;

        let blocks = BlockStore::new(store);
        assert!(blocks.has_block(a, b).await.unwrap());
        assert!(!blocks.has_block(b, a).await.unwrap());
        assert!(blocks.is_blocked_by(b, a).await.unwrap());

        assert!(blocks.any_block_exists(a, b).await.unwrap());
        assert!(blocks.any_block_exists(b, a).await.unwrap());

        assert!(blocks.excluded_authors(a).await.unwrap().contains(&b));
        assert!(blocks.excluded_authors(b).await.unwrap().contains(&a));
    }

    #[tokio::test]
    async fn exclusion_set_is_the_union_of_directions() {
        let store = Arc::new(MemoryStore::new());
        let viewer = Uuid::new_v4();
        let blocked_by_viewer = Uuid::new_v4();
        let blocks_viewer = Uuid::new_v4();
        let unrelated = Uuid::new_v4();
        store.add_block(viewer, blocked_by_viewer).await;
        store.add_block(blocks_viewer, viewer).await;

        let blocks = BlockStore::new(store);
        let excluded = blocks.excluded_authors(viewer).await.unwrap();
        assert_eq!(
            excluded,
            [blocked_by_viewer, blocks_viewer].into_iter().collect()
        );
        assert!(!excluded.contains(&unrelated));
    }
}
