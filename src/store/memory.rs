//! In-process [`ContentStore`] backed by plain maps behind an async RwLock.
//! Used by the test suite and by embedders that keep the corpus in memory.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Block, Board, ContentItem, Contributor, Follow, FollowTarget, LinkedAccount, Moderation,
    NotificationRecord, Reputation, Sort, Subscription,
};
use crate::store::{ContentStore, ListingQuery};

/// Profile data the store owns about a user: what listings need beyond the
/// viewer context supplied by the identity layer.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub is_private: bool,
    pub reputation: Reputation,
}

impl UserProfile {
    pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_private: false,
            reputation: Reputation::default(),
        }
    }
}

#[derive(Default)]
struct Inner {
    items: HashMap<Uuid, ContentItem>,
    boards: HashMap<Uuid, Board>,
    users: HashMap<Uuid, UserProfile>,
    subscriptions: Vec<Subscription>,
    follows: Vec<Follow>,
    moderations: Vec<Moderation>,
    contributors: Vec<Contributor>,
    blocks: Vec<Block>,
    notifications: Vec<NotificationRecord>,
    account_links: Vec<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_item(&self, item: ContentItem) {
        self.inner.write().await.items.insert(item.id, item);
    }

    pub async fn insert_board(&self, board: Board) {
        self.inner.write().await.boards.insert(board.id, board);
    }

    pub async fn insert_user(&self, user: UserProfile) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn subscribe(&self, user_id: Uuid, board_id: Uuid, is_active: bool) {
        self.inner.write().await.subscriptions.push(Subscription {
            user_id,
            board_id,
            is_active,
        });
    }

    pub async fn follow(&self, follower_id: Uuid, followed_id: Uuid) {
        self.inner.write().await.follows.push(Follow {
            follower_id,
            followed_id,
            created_at: Utc::now(),
        });
    }

    pub async fn add_moderation(&self, moderation: Moderation) {
        self.inner.write().await.moderations.push(moderation);
    }

    pub async fn add_contributor(&self, user_id: Uuid, board_id: Uuid, is_active: bool) {
        self.inner.write().await.contributors.push(Contributor {
            user_id,
            board_id,
            is_active,
        });
    }

    pub async fn add_block(&self, blocker_id: Uuid, blocked_id: Uuid) {
        self.inner.write().await.blocks.push(Block {
            blocker_id,
            blocked_id,
            created_at: Utc::now(),
        });
    }

    pub async fn push_notification(&self, record: NotificationRecord) {
        self.inner.write().await.notifications.push(record);
    }

    pub async fn link_accounts(&self, first: Uuid, second: Uuid) {
        self.inner.write().await.account_links.push((first, second));
    }
}

fn comment_alive(inner: &Inner, comment_id: Uuid) -> bool {
    inner
        .items
        .get(&comment_id)
        .map(|c| !c.is_banned && !c.is_deleted)
        .unwrap_or(false)
}

fn matches_query(query: &ListingQuery, item: &ContentItem) -> bool {
    if !query.predicates.iter().all(|p| p.matches(item)) {
        return false;
    }
    if let Some(kind) = query.item_kind {
        if item.kind != kind {
            return false;
        }
    }
    if let Some(board_id) = query.board_id {
        if item.board_id != board_id {
            return false;
        }
    }
    if let Some(author_id) = query.author_id {
        if item.author_id != author_id {
            return false;
        }
    }
    if let Some(scope) = &query.scope {
        if !(scope.boards.contains(&item.board_id) || scope.authors.contains(&item.author_id)) {
            return false;
        }
    }
    if let Some(overlay) = &query.overlay {
        let authorized = item.author_id == overlay.viewer_id
            || item.is_public
            || overlay.boards.contains(&item.board_id);
        if !authorized {
            return false;
        }
    }
    if query.public_only && !item.is_public {
        return false;
    }
    if query.excluded_authors.contains(&item.author_id) {
        return false;
    }
    if let Some(cutoff) = query.created_after {
        if item.created_at < cutoff {
            return false;
        }
    }
    true
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn select_items(&self, query: &ListingQuery) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<&ContentItem> = inner
            .items
            .values()
            .filter(|item| matches_query(query, item))
            .collect();

        // Descending by the selected score, item id as deterministic tie-break.
        match query.order {
            Sort::New => matched
                .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))),
            Sort::Hot => matched.sort_by(|a, b| {
                b.scores
                    .hot
                    .total_cmp(&a.scores.hot)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            Sort::Disputed => matched.sort_by(|a, b| {
                b.scores
                    .disputed
                    .total_cmp(&a.scores.disputed)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            Sort::Top => matched.sort_by(|a, b| {
                b.scores
                    .top
                    .total_cmp(&a.scores.top)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            Sort::Activity => matched.sort_by(|a, b| {
                b.scores
                    .activity
                    .total_cmp(&a.scores.activity)
                    .then_with(|| b.id.cmp(&a.id))
            }),
        }

        Ok(matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|item| item.id)
            .collect())
    }

    async fn board_exists(&self, board_id: Uuid) -> Result<bool> {
        Ok(self.inner.read().await.boards.contains_key(&board_id))
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.inner.read().await.users.contains_key(&user_id))
    }

    async fn active_subscriptions(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active)
            .map(|s| s.board_id)
            .collect())
    }

    async fn follow_targets(&self, user_id: Uuid) -> Result<Vec<FollowTarget>> {
        let inner = self.inner.read().await;
        Ok(inner
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| FollowTarget {
                user_id: f.followed_id,
                is_private: inner
                    .users
                    .get(&f.followed_id)
                    .map(|u| u.is_private)
                    .unwrap_or(false),
            })
            .collect())
    }

    async fn moderations(&self, user_id: Uuid) -> Result<Vec<Moderation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .moderations
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn active_contributions(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .contributors
            .iter()
            .filter(|c| c.user_id == user_id && c.is_active)
            .map(|c| c.board_id)
            .collect())
    }

    async fn block_exists(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .iter()
            .any(|b| b.blocker_id == blocker_id && b.blocked_id == blocked_id))
    }

    async fn blocked_targets(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .iter()
            .filter(|b| b.blocker_id == user_id)
            .map(|b| b.blocked_id)
            .collect())
    }

    async fn blocking_sources(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .iter()
            .filter(|b| b.blocked_id == user_id)
            .map(|b| b.blocker_id)
            .collect())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<&NotificationRecord> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !unread_only || !n.read)
            .filter(|n| comment_alive(&inner, n.comment_id))
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_notifications_read(&self, ids: &[Uuid]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let ids: HashSet<&Uuid> = ids.iter().collect();
        for record in inner.notifications.iter_mut() {
            if ids.contains(&record.id) {
                record.read = true;
            }
        }
        Ok(())
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .filter(|n| comment_alive(&inner, n.comment_id))
            .count() as u64)
    }

    async fn has_unresolved_reports(&self, board_ids: &HashSet<Uuid>) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.items.values().any(|item| {
            board_ids.contains(&item.board_id)
                && !item.mod_approved
                && item.report_count >= 1
                && !item.is_banned
        }))
    }

    async fn reputation(&self, user_id: Uuid) -> Result<Reputation> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&user_id)
            .map(|u| u.reputation)
            .unwrap_or_default())
    }

    async fn linked_accounts_out(&self, user_id: Uuid) -> Result<Vec<LinkedAccount>> {
        let inner = self.inner.read().await;
        Ok(inner
            .account_links
            .iter()
            .filter(|(first, _)| *first == user_id)
            .filter_map(|(_, second)| inner.users.get(second))
            .map(|u| LinkedAccount {
                user_id: u.id,
                display_name: u.display_name.clone(),
            })
            .collect())
    }

    async fn linked_accounts_in(&self, user_id: Uuid) -> Result<Vec<LinkedAccount>> {
        let inner = self.inner.read().await;
        Ok(inner
            .account_links
            .iter()
            .filter(|(_, second)| *second == user_id)
            .filter_map(|(first, _)| inner.users.get(first))
            .map(|u| LinkedAccount {
                user_id: u.id,
                display_name: u.display_name.clone(),
            })
            .collect())
    }
}
