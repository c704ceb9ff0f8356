//! Personalization scope resolution.
//!
//! The scope decides which boards and authors the personalized home feed
//! draws from, and which boards grant the viewer a moderation or contributor
//! visibility override. The four relationship reads are independent and run
//! concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Viewer;
use crate::store::{ContentStore, ScopeFilter};

#[derive(Debug, Clone, Default)]
pub struct ViewerScope {
    pub subscribed_boards: HashSet<Uuid>,
    pub followed_authors: HashSet<Uuid>,
    pub moderated_boards: HashSet<Uuid>,
    pub contributed_boards: HashSet<Uuid>,
}

impl ViewerScope {
    /// The home-feed membership filter: board subscribed or author followed.
    pub fn home_filter(&self) -> ScopeFilter {
        ScopeFilter {
            boards: self.subscribed_boards.clone(),
            authors: self.followed_authors.clone(),
        }
    }

    /// Boards where the viewer holds an authorization override
    /// (moderated or contributed).
    pub fn override_boards(&self) -> HashSet<Uuid> {
        self.moderated_boards
            .union(&self.contributed_boards)
            .copied()
            .collect()
    }
}

#[derive(Clone)]
pub struct ScopeResolver {
    store: Arc<dyn ContentStore>,
}

impl ScopeResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, viewer: &Viewer) -> Result<ViewerScope> {
        let (subscriptions, follows, moderations, contributions) = tokio::join!(
            self.store.active_subscriptions(viewer.id),
            self.store.follow_targets(viewer.id),
            self.store.moderations(viewer.id),
            self.store.active_contributions(viewer.id),
        );

        let scope = ViewerScope {
            subscribed_boards: subscriptions?.into_iter().collect(),
            // Private accounts never feed their followers' home scope.
            followed_authors: follows?
                .into_iter()
                .filter(|t| !t.is_private)
                .map(|t| t.user_id)
                .collect(),
            moderated_boards: moderations?
                .into_iter()
                .filter(|m| m.grants_override())
                .map(|m| m.board_id)
                .collect(),
            contributed_boards: contributions?.into_iter().collect(),
        };

        tracing::debug!(
            viewer = %viewer.id,
            subscribed = scope.subscribed_boards.len(),
            followed = scope.followed_authors.len(),
            moderated = scope.moderated_boards.len(),
            contributed = scope.contributed_boards.len(),
            "resolved viewer scope"
        );

        Ok(scope)
    }

    /// Boards the viewer moderates with an accepted invite, regardless of
    /// rescission state. Used by the report-queue flag.
    pub async fn accepted_moderated_boards(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .store
            .moderations(viewer_id)
            .await?
            .into_iter()
            .filter(|m| m.accepted)
            .map(|m| m.board_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Moderation;
    use crate::store::MemoryStore;
    use crate::store::memory::UserProfile;

    #[tokio::test]
    async fn scope_honors_activity_privacy_and_rescission() {
        let store = Arc::new(MemoryStore::new());
        let viewer = Viewer::new(Uuid::new_v4());

        let active_board = Uuid::new_v4();
        let lapsed_board = Uuid::new_v4();
        store.subscribe(viewer.id, active_board, true).await;
        store.subscribe(viewer.id, lapsed_board, false).await;

        let open_user = Uuid::new_v4();
        let private_user = Uuid::new_v4();
        store
            .insert_user(UserProfile::new(open_user, "open"))
            .await;
        store
            .insert_user(UserProfile {
                is_private: true,
                ..UserProfile::new(private_user, "private")
            })
            .await;
        store.follow(viewer.id, open_user).await;
        store.follow(viewer.id, private_user).await;

        let modded = Uuid::new_v4();
        let rescinded = Uuid::new_v4();
        let unaccepted = Uuid::new_v4();
        store
            .add_moderation(Moderation {
                user_id: viewer.id,
                board_id: modded,
                accepted: true,
                invite_rescinded: false,
            })
            .await;
        store
            .add_moderation(Moderation {
                user_id: viewer.id,
                board_id: rescinded,
                accepted: true,
                invite_rescinded: true,
            })
            .await;
        store
            .add_moderation(Moderation {
                user_id: viewer.id,
                board_id: unaccepted,
                accepted: false,
                invite_rescinded: false,
            })
            .await;

        let contrib = Uuid::new_v4();
        store.add_contributor(viewer.id, contrib, true).await;

        let resolver = ScopeResolver::new(store);
        let scope = resolver.resolve(&viewer).await.unwrap();

        assert_eq!(
            scope.subscribed_boards,
            [active_board].into_iter().collect()
        );
        assert_eq!(scope.followed_authors, [open_user].into_iter().collect());
        assert_eq!(scope.moderated_boards, [modded].into_iter().collect());
        assert_eq!(scope.contributed_boards, [contrib].into_iter().collect());
        assert_eq!(
            scope.override_boards(),
            [modded, contrib].into_iter().collect()
        );

        let home = scope.home_filter();
        assert!(home.boards.contains(&active_board));
        assert!(home.authors.contains(&open_user));
    }

    #[tokio::test]
    async fn report_queue_boards_ignore_rescission_but_require_acceptance() {
        let store = Arc::new(MemoryStore::new());
        let viewer_id = Uuid::new_v4();
        let accepted = Uuid::new_v4();
        let rescinded_but_accepted = Uuid::new_v4();
        let pending = Uuid::new_v4();

        for (board_id, acc, resc) in [
            (accepted, true, false),
            (rescinded_but_accepted, true, true),
            (pending, false, false),
        ] {
            store
                .add_moderation(Moderation {
                    user_id: viewer_id,
                    board_id,
                    accepted: acc,
                    invite_rescinded: resc,
                })
                .await;
        }

        let resolver = ScopeResolver::new(store);
        let boards = resolver.accepted_moderated_boards(viewer_id).await.unwrap();
        assert_eq!(
            boards,
            [accepted, rescinded_but_accepted].into_iter().collect()
        );
    }
}
