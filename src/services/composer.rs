//! Feed query composition.
//!
//! Combines the visibility policy, the viewer's personalization scope, block
//! exclusion, the time window, and the sort selection into one retrieval
//! against the data store, pages the result, and memoizes it per parameter
//! tuple.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::blocks::BlockStore;
use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    ItemKind, LinkedAccount, ListingKind, ListingPage, Reputation, Sort, TimeWindow, Viewer,
};
use crate::policy::{build_predicates, PolicyOptions};
use crate::scope::ScopeResolver;
use crate::store::{AccessOverlay, ContentStore, ListingQuery};

/// Explicit cache key for a composed listing: viewer identity (or the
/// anonymous marker), listing parameters, and the viewer's preference bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListingKey {
    viewer_id: Option<Uuid>,
    kind: ListingKind,
    sort: Sort,
    page: u32,
    window: TimeWindow,
    prefs: u8,
}

impl ListingKey {
    fn new(
        viewer: Option<&Viewer>,
        kind: ListingKind,
        sort: Sort,
        page: u32,
        window: TimeWindow,
    ) -> Self {
        let prefs = viewer.map(preference_bits).unwrap_or(0);
        Self {
            viewer_id: viewer.map(|v| v.id),
            kind,
            sort,
            page,
            window,
            prefs,
        }
    }
}

/// Preferences fold into the cache key so a preference change takes effect
/// immediately rather than after TTL expiry.
fn preference_bits(viewer: &Viewer) -> u8 {
    let mut bits = 0u8;
    if viewer.allow_adult {
        bits |= 1;
    }
    if viewer.hide_offensive {
        bits |= 1 << 1;
    }
    if viewer.show_nsfl {
        bits |= 1 << 2;
    }
    if viewer.is_moderator_grade() {
        bits |= 1 << 3;
    }
    if viewer.has_full_override() {
        bits |= 1 << 4;
    }
    bits
}

/// The read-path engine. Stateless between requests apart from the caches.
pub struct FeedComposer {
    store: Arc<dyn ContentStore>,
    scope: ScopeResolver,
    blocks: BlockStore,
    config: Config,
    listings: TtlCache<ListingKey, ListingPage>,
    counters: TtlCache<Uuid, Reputation>,
    flags: TtlCache<Uuid, bool>,
}

impl FeedComposer {
    pub fn new(store: Arc<dyn ContentStore>, config: Config) -> Self {
        Self {
            scope: ScopeResolver::new(Arc::clone(&store)),
            blocks: BlockStore::new(Arc::clone(&store)),
            store,
            config,
            listings: TtlCache::new(),
            counters: TtlCache::new(),
            flags: TtlCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compose one listing page through the result cache.
    ///
    /// Identical parameters within the listing TTL return the memoized page,
    /// even if the underlying data changed in between; that bounded staleness
    /// is a deliberate property of the engine.
    pub async fn compose_listing(
        &self,
        kind: ListingKind,
        viewer: Option<&Viewer>,
        sort: Sort,
        page: u32,
        window: TimeWindow,
    ) -> Result<ListingPage> {
        if page < 1 {
            return Err(AppError::Validation("page must be >= 1".into()));
        }

        let key = ListingKey::new(viewer, kind, sort, page, window);
        self.listings
            .get_or_compute(key, self.config.listing_ttl(), || {
                self.compose_uncached(kind, viewer, sort, page, window)
            })
            .await
    }

    /// Compose one listing page, bypassing the result cache. The
    /// notification mark-read side effect fires on this path only, after the
    /// result set is finalized.
    pub async fn compose_uncached(
        &self,
        kind: ListingKind,
        viewer: Option<&Viewer>,
        sort: Sort,
        page: u32,
        window: TimeWindow,
    ) -> Result<ListingPage> {
        if page < 1 {
            return Err(AppError::Validation("page must be >= 1".into()));
        }

        match kind {
            ListingKind::Home => self.compose_home(viewer, sort, page, window).await,
            ListingKind::Board(board_id) => {
                self.compose_board(board_id, viewer, sort, page, window).await
            }
            ListingKind::UserPosts(author_id) => {
                self.compose_author(author_id, ItemKind::Post, viewer, sort, page, window)
                    .await
            }
            ListingKind::UserComments(author_id) => {
                self.compose_author(author_id, ItemKind::Comment, viewer, sort, page, window)
                    .await
            }
            ListingKind::Notifications { all } => self.compose_notifications(viewer, !all, page).await,
        }
    }

    async fn compose_home(
        &self,
        viewer: Option<&Viewer>,
        sort: Sort,
        page: u32,
        window: TimeWindow,
    ) -> Result<ListingPage> {
        let Some(viewer) = viewer else {
            // The home feed draws from subscriptions and follows; an
            // anonymous visitor has neither.
            debug!("anonymous home feed request, returning empty page");
            return Ok(ListingPage::empty());
        };

        let predicates = build_predicates(
            Some(viewer),
            PolicyOptions {
                home_feed: true,
                subject_author: None,
            },
        );

        let (scope, excluded) = tokio::join!(
            self.scope.resolve(viewer),
            self.excluded_authors_for(Some(viewer))
        );
        let scope = scope?;

        let mut query = self.base_query(sort, page);
        query.predicates = predicates;
        query.item_kind = Some(ItemKind::Post);
        query.scope = Some(scope.home_filter());
        if !viewer.has_full_override() {
            query.overlay = Some(AccessOverlay {
                viewer_id: viewer.id,
                boards: scope.override_boards(),
            });
        }
        query.excluded_authors = excluded?;
        query.created_after = window.cutoff(Utc::now());

        self.run_paged(query).await
    }

    async fn compose_board(
        &self,
        board_id: Uuid,
        viewer: Option<&Viewer>,
        sort: Sort,
        page: u32,
        window: TimeWindow,
    ) -> Result<ListingPage> {
        if !self.store.board_exists(board_id).await? {
            debug!(board = %board_id, "unknown board, returning empty page");
            return Ok(ListingPage::empty());
        }

        let mut query = self.base_query(sort, page);
        query.predicates = build_predicates(viewer, PolicyOptions::default());
        query.item_kind = Some(ItemKind::Post);
        query.board_id = Some(board_id);
        query.excluded_authors = self.excluded_authors_for(viewer).await?;
        query.created_after = window.cutoff(Utc::now());

        self.run_paged(query).await
    }

    async fn compose_author(
        &self,
        author_id: Uuid,
        item_kind: ItemKind,
        viewer: Option<&Viewer>,
        sort: Sort,
        page: u32,
        window: TimeWindow,
    ) -> Result<ListingPage> {
        if !self.store.user_exists(author_id).await? {
            debug!(author = %author_id, "unknown author, returning empty page");
            return Ok(ListingPage::empty());
        }

        let mut query = self.base_query(sort, page);
        query.predicates = build_predicates(
            viewer,
            PolicyOptions {
                home_feed: false,
                subject_author: Some(author_id),
            },
        );
        query.item_kind = Some(item_kind);
        query.author_id = Some(author_id);
        query.created_after = window.cutoff(Utc::now());

        match viewer {
            None => {
                query.public_only = true;
            }
            Some(v) if v.has_full_override() => {}
            Some(v) => {
                let (scope, excluded) =
                    tokio::join!(self.scope.resolve(v), self.blocks.excluded_authors(v.id));
                query.overlay = Some(AccessOverlay {
                    viewer_id: v.id,
                    boards: scope?.override_boards(),
                });
                query.excluded_authors = excluded?;
            }
        }

        self.run_paged(query).await
    }

    async fn compose_notifications(
        &self,
        viewer: Option<&Viewer>,
        unread_only: bool,
        page: u32,
    ) -> Result<ListingPage> {
        let Some(viewer) = viewer else {
            debug!("anonymous notifications request, returning empty page");
            return Ok(ListingPage::empty());
        };

        let page_size = self.config.page_size as u64;
        let offset = page_size * (page as u64 - 1);
        let records = self
            .store
            .list_notifications(viewer.id, unread_only, offset, page_size + 1)
            .await?;

        let has_more = records.len() as u64 > page_size;
        let records = &records[..records.len().min(page_size as usize)];

        let item_ids: Vec<Uuid> = records.iter().map(|r| r.comment_id).collect();

        // The only mutation on the read path: returned records become read,
        // strictly after the result set is finalized. Idempotent.
        let record_ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        self.store.mark_notifications_read(&record_ids).await?;

        debug!(
            viewer = %viewer.id,
            returned = item_ids.len(),
            has_more,
            "composed notifications page"
        );
        Ok(ListingPage { item_ids, has_more })
    }

    fn base_query(&self, sort: Sort, page: u32) -> ListingQuery {
        let page_size = self.config.page_size as u64;
        ListingQuery::new(sort, page_size * (page as u64 - 1), page_size + 1)
    }

    /// Block exclusion is a personalization feature: full-override admins
    /// and anonymous visitors have no exclusion set.
    async fn excluded_authors_for(&self, viewer: Option<&Viewer>) -> Result<HashSet<Uuid>> {
        match viewer {
            Some(v) if !v.has_full_override() => self.blocks.excluded_authors(v.id).await,
            _ => Ok(HashSet::new()),
        }
    }

    /// Fetch page_size + 1 rows; the extra row signals further pages without
    /// a count query.
    async fn run_paged(&self, query: ListingQuery) -> Result<ListingPage> {
        let page_size = self.config.page_size as usize;
        let mut item_ids = self.store.select_items(&query).await?;
        let has_more = item_ids.len() > page_size;
        item_ids.truncate(page_size);
        Ok(ListingPage { item_ids, has_more })
    }

    /// Unread notifications whose linked comment is still alive.
    pub async fn count_unread_notifications(&self, viewer_id: Uuid) -> Result<u64> {
        self.store.count_unread_notifications(viewer_id).await
    }

    /// Existence test over both block directions.
    pub async fn has_block_between(&self, a: Uuid, b: Uuid) -> Result<bool> {
        self.blocks.any_block_exists(a, b).await
    }

    /// Whether any board the viewer moderates holds an unapproved, reported,
    /// non-banned item. Memoized with the short flag TTL.
    pub async fn has_report_queue(&self, viewer_id: Uuid) -> Result<bool> {
        self.flags
            .get_or_compute(viewer_id, self.config.flag_ttl(), || async move {
                let boards = self.scope.accepted_moderated_boards(viewer_id).await?;
                if boards.is_empty() {
                    return Ok(false);
                }
                self.store.has_unresolved_reports(&boards).await
            })
            .await
    }

    /// Externally computed reputation counters, memoized with the counter
    /// TTL.
    pub async fn reputation(&self, user_id: Uuid) -> Result<Reputation> {
        self.counters
            .get_or_compute(user_id, self.config.counter_ttl(), || {
                self.store.reputation(user_id)
            })
            .await
    }

    /// Deterministic union of both directional linked-account queries,
    /// deduplicated and sorted by display name.
    pub async fn linked_accounts(&self, user_id: Uuid) -> Result<Vec<LinkedAccount>> {
        let (outgoing, incoming) = tokio::join!(
            self.store.linked_accounts_out(user_id),
            self.store.linked_accounts_in(user_id)
        );

        let mut seen = HashSet::new();
        let mut linked: Vec<LinkedAccount> = outgoing?
            .into_iter()
            .chain(incoming?)
            .filter(|a| seen.insert(a.user_id))
            .collect();
        linked.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(linked)
    }
}
