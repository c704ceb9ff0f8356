use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// The acting identity for a request, as resolved by the identity layer.
/// Anonymous visitors are represented by the absence of a `Viewer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    pub id: Uuid,
    /// Maturity preference: whether adult-flagged content is acceptable.
    pub allow_adult: bool,
    pub hide_offensive: bool,
    pub show_nsfl: bool,
    /// Private accounts are suppressed from their followers' home scope.
    pub is_private: bool,
    /// 0 = none, >=3 = moderator-grade, >=4 = full visibility override.
    pub admin_level: u8,
    /// Admin who suspended this account, if any.
    pub banned_by: Option<Uuid>,
    /// End of a timed suspension; `None` with `banned_by` set means permanent.
    pub unban_at: Option<DateTime<Utc>>,
}

impl Viewer {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            allow_adult: false,
            hide_offensive: false,
            show_nsfl: false,
            is_private: false,
            admin_level: 0,
            banned_by: None,
            unban_at: None,
        }
    }

    /// Moderator-grade admins may see deleted content.
    pub fn is_moderator_grade(&self) -> bool {
        self.admin_level >= 3
    }

    /// Full-override admins bypass scope overlay and block exclusion.
    pub fn has_full_override(&self) -> bool {
        self.admin_level >= 4
    }

    /// Suspended: banned with no unban time, or an unban time still ahead.
    pub fn is_suspended(&self) -> bool {
        self.banned_by.is_some() && self.unban_at.map(|t| t > Utc::now()).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Post,
    Comment,
}

/// Per-sort ranking scores supplied by the external scoring pipeline.
/// Opaque values, compared only for ordering.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RankingScores {
    pub hot: f64,
    pub disputed: f64,
    pub top: f64,
    pub activity: f64,
}

/// A post or comment as seen by the read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub author_id: Uuid,
    pub board_id: Uuid,
    pub kind: ItemKind,
    pub created_at: DateTime<Utc>,

    // Lifecycle flags
    pub is_banned: bool,
    pub is_deleted: bool,
    pub is_stickied: bool,
    pub mod_approved: bool,
    pub report_count: u32,

    // Audience flags
    pub over_18: bool,
    pub is_offensive: bool,
    pub is_nsfl: bool,
    pub is_public: bool,

    pub scores: RankingScores,
}

/// A topical grouping (board) that content belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub is_banned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: Uuid,
    pub board_id: Uuid,
    pub is_active: bool,
}

/// Directional follow edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: Uuid,
    pub followed_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A follow target together with the privacy flag that decides whether the
/// target's content enters the follower's home scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowTarget {
    pub user_id: Uuid,
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moderation {
    pub user_id: Uuid,
    pub board_id: Uuid,
    pub accepted: bool,
    pub invite_rescinded: bool,
}

impl Moderation {
    /// Only an accepted, non-rescinded moderation grants the visibility
    /// override.
    pub fn grants_override(&self) -> bool {
        self.accepted && !self.invite_rescinded
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub user_id: Uuid,
    pub board_id: Uuid,
    pub is_active: bool,
}

/// Directional block edge. Exclusion derived from it is bidirectional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Wraps a comment for a viewer's inbox with an unread flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comment_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Externally computed reputation counters for a user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Reputation {
    pub post: i64,
    pub comment: i64,
}

/// One side of a linked-account (alt) edge, carried with the display name
/// used as the deterministic sort key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub user_id: Uuid,
    pub display_name: String,
}

/// Listing sort selector. An unrecognized token is a request-validation
/// failure; there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    Hot,
    New,
    Disputed,
    Top,
    Activity,
}

impl FromStr for Sort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Sort::Hot),
            "new" => Ok(Sort::New),
            "disputed" => Ok(Sort::Disputed),
            "top" => Ok(Sort::Top),
            "activity" => Ok(Sort::Activity),
            other => Err(AppError::Validation(format!("unknown sort: {}", other))),
        }
    }
}

/// Time window for listing cutoff. Unknown tokens are tolerated and treated
/// as all-time so that future values degrade gracefully instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn from_token(token: &str) -> Self {
        match token {
            "day" => TimeWindow::Day,
            "week" => TimeWindow::Week,
            "month" => TimeWindow::Month,
            "year" => TimeWindow::Year,
            "all" => TimeWindow::All,
            other => {
                tracing::debug!(token = %other, "unknown time window token, treating as all-time");
                TimeWindow::All
            }
        }
    }

    /// Oldest admissible creation time, or `None` for all-time.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = match self {
            TimeWindow::Day => 86_400,
            TimeWindow::Week => 604_800,
            TimeWindow::Month => 2_592_000,
            TimeWindow::Year => 31_536_000,
            TimeWindow::All => return None,
        };
        Some(now - Duration::seconds(secs))
    }
}

/// What is being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingKind {
    /// The viewer's personalized home feed.
    Home,
    /// All content in one board.
    Board(Uuid),
    /// Posts authored by one user.
    UserPosts(Uuid),
    /// Comments authored by one user.
    UserComments(Uuid),
    /// The viewer's notification inbox; `all = false` restricts to unread.
    Notifications { all: bool },
}

/// One page of composed listing results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub item_ids: Vec<Uuid>,
    pub has_more: bool,
}

impl ListingPage {
    pub fn empty() -> Self {
        Self {
            item_ids: Vec::new(),
            has_more: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_tokens_parse() {
        assert_eq!("hot".parse::<Sort>().unwrap(), Sort::Hot);
        assert_eq!("activity".parse::<Sort>().unwrap(), Sort::Activity);
        assert!(matches!(
            "bogus".parse::<Sort>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_window_token_degrades_to_all_time() {
        assert_eq!(TimeWindow::from_token("week"), TimeWindow::Week);
        assert_eq!(TimeWindow::from_token("fortnight"), TimeWindow::All);
        assert_eq!(TimeWindow::from_token(""), TimeWindow::All);
    }

    #[test]
    fn window_cutoffs() {
        let now = Utc::now();
        assert_eq!(
            TimeWindow::Day.cutoff(now),
            Some(now - Duration::seconds(86_400))
        );
        assert_eq!(
            TimeWindow::Year.cutoff(now),
            Some(now - Duration::seconds(31_536_000))
        );
        assert_eq!(TimeWindow::All.cutoff(now), None);
    }

    #[test]
    fn suspension_covers_permanent_and_timed_bans() {
        let mut viewer = Viewer::new(Uuid::new_v4());
        assert!(!viewer.is_suspended());

        viewer.banned_by = Some(Uuid::new_v4());
        assert!(viewer.is_suspended(), "permanent ban");

        viewer.unban_at = Some(Utc::now() + Duration::days(3));
        assert!(viewer.is_suspended(), "timed ban still running");

        viewer.unban_at = Some(Utc::now() - Duration::days(3));
        assert!(!viewer.is_suspended(), "timed ban expired");
    }

    #[test]
    fn viewer_round_trips_through_json() {
        let viewer = Viewer {
            allow_adult: true,
            admin_level: 4,
            ..Viewer::new(Uuid::new_v4())
        };
        let json = serde_json::to_string(&viewer).unwrap();
        let back: Viewer = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, viewer.id);
        assert!(back.allow_adult);
        assert!(back.has_full_override());
    }
}
