//! Data-store seam.
//!
//! Persistence is an external collaborator: this crate only requires
//! predicate-filtered, sorted, offset/limit retrieval plus a handful of
//! relationship lookups, expressed by [`ContentStore`]. `MemoryStore` is the
//! in-process implementation used by tests and embedders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    FollowTarget, ItemKind, LinkedAccount, Moderation, NotificationRecord, Reputation, Sort,
};
use crate::policy::Predicate;

pub mod memory;

pub use memory::MemoryStore;

/// Personalization scope filter for the home feed: an item qualifies when its
/// board or its author is in scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    pub boards: HashSet<Uuid>,
    pub authors: HashSet<Uuid>,
}

impl ScopeFilter {
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.authors.is_empty()
    }
}

/// Authorization overlay for non-override viewers: the item must be authored
/// by the viewer, publicly listable, or sit in a board the viewer moderates
/// or contributes to. Applied as an extra conjunct, independent of scope.
#[derive(Debug, Clone)]
pub struct AccessOverlay {
    pub viewer_id: Uuid,
    pub boards: HashSet<Uuid>,
}

/// One composed retrieval request. The store applies every part as a
/// conjunction, orders by the requested sort (descending), and pages with
/// offset/limit.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub predicates: Vec<Predicate>,
    pub item_kind: Option<ItemKind>,
    pub board_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// Home-feed personalization scope, if any.
    pub scope: Option<ScopeFilter>,
    /// Authorization overlay for viewers without full override.
    pub overlay: Option<AccessOverlay>,
    /// Anonymous overlay: publicly listable items only.
    pub public_only: bool,
    /// Authors excluded by block relationships, either direction.
    pub excluded_authors: HashSet<Uuid>,
    /// Time-window cutoff; items created before this are dropped.
    pub created_after: Option<DateTime<Utc>>,
    pub order: Sort,
    pub offset: u64,
    pub limit: u64,
}

impl ListingQuery {
    pub fn new(order: Sort, offset: u64, limit: u64) -> Self {
        Self {
            predicates: Vec::new(),
            item_kind: None,
            board_id: None,
            author_id: None,
            scope: None,
            overlay: None,
            public_only: false,
            excluded_authors: HashSet::new(),
            created_after: None,
            order,
            offset,
            limit,
        }
    }
}

/// Read-path retrieval operations this engine consumes. All methods are
/// side-effect free except [`mark_notifications_read`].
///
/// [`mark_notifications_read`]: ContentStore::mark_notifications_read
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Execute one composed listing query and return matching item IDs in
    /// requested order.
    async fn select_items(&self, query: &ListingQuery) -> Result<Vec<Uuid>>;

    async fn board_exists(&self, board_id: Uuid) -> Result<bool>;

    async fn user_exists(&self, user_id: Uuid) -> Result<bool>;

    /// Boards the user holds an active subscription to.
    async fn active_subscriptions(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Users this user follows, with the target's privacy flag.
    async fn follow_targets(&self, user_id: Uuid) -> Result<Vec<FollowTarget>>;

    /// All moderation relationships for the user, accepted or not.
    async fn moderations(&self, user_id: Uuid) -> Result<Vec<Moderation>>;

    /// Boards the user holds an active contributor relationship with.
    async fn active_contributions(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Existence check on one directed block edge.
    async fn block_exists(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool>;

    /// Users this user has blocked (outgoing edges).
    async fn blocked_targets(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Users who have blocked this user (incoming edges).
    async fn blocking_sources(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Notification records for a viewer, newest first, excluding records
    /// whose linked comment is banned or deleted.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>>;

    /// Mark notification records read. Idempotent.
    async fn mark_notifications_read(&self, ids: &[Uuid]) -> Result<()>;

    /// Unread notifications whose linked comment is still alive.
    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<u64>;

    /// Whether any board in the set holds an unapproved, reported,
    /// non-banned item.
    async fn has_unresolved_reports(&self, board_ids: &HashSet<Uuid>) -> Result<bool>;

    /// Externally computed reputation counters.
    async fn reputation(&self, user_id: Uuid) -> Result<Reputation>;

    /// Outgoing linked-account edges (this user listed first on the edge).
    async fn linked_accounts_out(&self, user_id: Uuid) -> Result<Vec<LinkedAccount>>;

    /// Incoming linked-account edges (this user listed second on the edge).
    async fn linked_accounts_in(&self, user_id: Uuid) -> Result<Vec<LinkedAccount>>;
}
