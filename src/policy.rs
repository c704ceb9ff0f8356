//! Visibility policy predicates.
//!
//! A listing never inspects the viewer inside the query path. Instead the
//! builder derives an explicit, ordered list of independent boolean filters
//! from the viewer context, and the store applies them as a conjunction.
//! Each predicate is independently testable and translatable by a backend.

use crate::models::{ContentItem, Viewer};
use uuid::Uuid;

/// One boolean filter over a content item. Predicates are independent; no
/// ordering dependency exists between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    NotBanned,
    NotDeleted,
    NotStickied,
    /// over_18 == false
    SafeForWork,
    /// is_offensive == false
    HideOffensive,
    /// is_nsfl == false
    HideNsfl,
}

impl Predicate {
    pub fn matches(&self, item: &ContentItem) -> bool {
        match self {
            Predicate::NotBanned => !item.is_banned,
            Predicate::NotDeleted => !item.is_deleted,
            Predicate::NotStickied => !item.is_stickied,
            Predicate::SafeForWork => !item.over_18,
            Predicate::HideOffensive => !item.is_offensive,
            Predicate::HideNsfl => !item.is_nsfl,
        }
    }
}

/// Listing-shape inputs that change which predicates apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyOptions {
    /// Stickied items are excluded from the algorithmic home feed only,
    /// never from per-board or per-author listings.
    pub home_feed: bool,
    /// The author a per-author listing is about, if any. Authors may see
    /// their own banned content.
    pub subject_author: Option<Uuid>,
}

/// Derive the predicate set for one request. Pure; must be re-derived per
/// request because viewer preferences can change between calls.
pub fn build_predicates(viewer: Option<&Viewer>, opts: PolicyOptions) -> Vec<Predicate> {
    let mut predicates = Vec::with_capacity(6);

    let moderator_grade = viewer.map(|v| v.is_moderator_grade()).unwrap_or(false);
    let viewer_is_subject = match (viewer, opts.subject_author) {
        (Some(v), Some(author)) => v.id == author,
        _ => false,
    };

    if !(moderator_grade || viewer_is_subject) {
        predicates.push(Predicate::NotBanned);
    }
    if !moderator_grade {
        predicates.push(Predicate::NotDeleted);
    }
    if !viewer.map(|v| v.allow_adult).unwrap_or(false) {
        predicates.push(Predicate::SafeForWork);
    }
    if viewer.map(|v| v.hide_offensive).unwrap_or(false) {
        predicates.push(Predicate::HideOffensive);
    }
    if !viewer.map(|v| v.show_nsfl).unwrap_or(false) {
        predicates.push(Predicate::HideNsfl);
    }
    if opts.home_feed {
        predicates.push(Predicate::NotStickied);
    }

    predicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKind, RankingScores};
    use chrono::Utc;

    fn item() -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            kind: ItemKind::Post,
            created_at: Utc::now(),
            is_banned: false,
            is_deleted: false,
            is_stickied: false,
            mod_approved: false,
            report_count: 0,
            over_18: false,
            is_offensive: false,
            is_nsfl: false,
            is_public: true,
            scores: RankingScores::default(),
        }
    }

    #[test]
    fn each_predicate_checks_one_flag() {
        let mut it = item();
        assert!(Predicate::NotBanned.matches(&it));
        it.is_banned = true;
        assert!(!Predicate::NotBanned.matches(&it));

        let mut it = item();
        it.is_nsfl = true;
        assert!(!Predicate::HideNsfl.matches(&it));
        assert!(Predicate::NotDeleted.matches(&it));
    }

    #[test]
    fn anonymous_gets_strictest_set() {
        let predicates = build_predicates(None, PolicyOptions::default());
        assert!(predicates.contains(&Predicate::NotBanned));
        assert!(predicates.contains(&Predicate::NotDeleted));
        assert!(predicates.contains(&Predicate::SafeForWork));
        assert!(predicates.contains(&Predicate::HideNsfl));
        // Anonymous visitors have no hide-offensive preference set.
        assert!(!predicates.contains(&Predicate::HideOffensive));
        assert!(!predicates.contains(&Predicate::NotStickied));
    }

    #[test]
    fn preferences_relax_audience_filters() {
        let mut viewer = Viewer::new(Uuid::new_v4());
        viewer.allow_adult = true;
        viewer.show_nsfl = true;
        viewer.hide_offensive = true;

        let predicates = build_predicates(Some(&viewer), PolicyOptions::default());
        assert!(!predicates.contains(&Predicate::SafeForWork));
        assert!(!predicates.contains(&Predicate::HideNsfl));
        assert!(predicates.contains(&Predicate::HideOffensive));
    }

    #[test]
    fn moderator_grade_admin_sees_lifecycle_hidden_content() {
        let mut viewer = Viewer::new(Uuid::new_v4());
        viewer.admin_level = 3;

        let predicates = build_predicates(Some(&viewer), PolicyOptions::default());
        assert!(!predicates.contains(&Predicate::NotBanned));
        assert!(!predicates.contains(&Predicate::NotDeleted));
    }

    #[test]
    fn author_sees_own_banned_but_not_deleted_content() {
        let viewer = Viewer::new(Uuid::new_v4());
        let opts = PolicyOptions {
            home_feed: false,
            subject_author: Some(viewer.id),
        };

        let predicates = build_predicates(Some(&viewer), opts);
        assert!(!predicates.contains(&Predicate::NotBanned));
        assert!(predicates.contains(&Predicate::NotDeleted));
    }

    #[test]
    fn home_feed_excludes_stickied() {
        let viewer = Viewer::new(Uuid::new_v4());
        let opts = PolicyOptions {
            home_feed: true,
            subject_author: None,
        };
        assert!(build_predicates(Some(&viewer), opts).contains(&Predicate::NotStickied));
    }
}
