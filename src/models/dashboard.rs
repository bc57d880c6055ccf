// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard view models and the recent-activity merge.
//!
//! Everything here is derived on each fetch and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{AuthorProfile, Comment, Like, Video, View};

/// Maximum entries kept in the merged activity feed.
pub const ACTIVITY_FEED_LIMIT: usize = 4;

/// Display name used when an actor has no profile (or is anonymous).
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Summary counters for the signed-in user's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub videos_count: u64,
    pub likes_count: u64,
    pub comments_count: u64,
    pub views_count: u64,
    /// Rewards received as an athlete (not tied to video ownership)
    pub rewards_count: u64,
}

/// One of the user's most recent videos with its view count attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentVideo {
    #[serde(flatten)]
    pub video: Video,
    pub views: u64,
}

/// What happened in an activity feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Like,
    Comment,
    View,
    Upload,
}

impl ActivityKind {
    /// Human-readable action text shown next to the actor's name.
    pub fn action(self) -> &'static str {
        match self {
            ActivityKind::Like => "liked your video",
            ActivityKind::Comment => "commented on your video",
            ActivityKind::View => "viewed your video",
            ActivityKind::Upload => "uploaded a video",
        }
    }
}

/// Entry in the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    /// ID of the underlying like/comment/view row
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub action: String,
    pub video_title: Option<String>,
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full dashboard view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub recent_videos: Vec<RecentVideo>,
    pub recent_activity: Vec<ActivityItem>,
}

/// Lookup tables for joining activity rows in memory.
#[derive(Debug, Default)]
pub struct ActivityLookup {
    names: HashMap<Uuid, Option<String>>,
    titles: HashMap<Uuid, String>,
}

impl ActivityLookup {
    pub fn new(profiles: &[AuthorProfile], titles: impl IntoIterator<Item = (Uuid, String)>) -> Self {
        Self {
            names: profiles
                .iter()
                .map(|p| (p.user_id, p.display_name.clone()))
                .collect(),
            titles: titles.into_iter().collect(),
        }
    }

    fn user_name(&self, user_id: Option<Uuid>) -> String {
        user_id
            .and_then(|id| self.names.get(&id).cloned().flatten())
            .unwrap_or_else(|| ANONYMOUS_NAME.to_string())
    }

    fn item(
        &self,
        kind: ActivityKind,
        id: Uuid,
        video_id: Uuid,
        user_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> ActivityItem {
        ActivityItem {
            id,
            kind,
            action: kind.action().to_string(),
            video_title: self.titles.get(&video_id).cloned(),
            user_name: Some(self.user_name(user_id)),
            created_at,
        }
    }
}

/// Join recent likes, comments and views into one feed.
///
/// Sorted newest first and truncated to [`ACTIVITY_FEED_LIMIT`]. Input order
/// does not matter, so sub-queries may resolve in any order.
pub fn merge_activity(
    likes: &[Like],
    comments: &[Comment],
    views: &[View],
    lookup: &ActivityLookup,
) -> Vec<ActivityItem> {
    let mut feed: Vec<ActivityItem> = Vec::with_capacity(likes.len() + comments.len() + views.len());

    feed.extend(likes.iter().map(|l| {
        lookup.item(ActivityKind::Like, l.id, l.video_id, Some(l.user_id), l.created_at)
    }));
    feed.extend(comments.iter().map(|c| {
        lookup.item(ActivityKind::Comment, c.id, c.video_id, Some(c.user_id), c.created_at)
    }));
    feed.extend(
        views
            .iter()
            .map(|v| lookup.item(ActivityKind::View, v.id, v.video_id, v.user_id, v.created_at)),
    );

    feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    feed.truncate(ACTIVITY_FEED_LIMIT);
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn like(video_id: Uuid, user_id: Uuid, t: i64) -> Like {
        Like {
            id: Uuid::new_v4(),
            video_id,
            user_id,
            created_at: at(t),
        }
    }

    fn comment(video_id: Uuid, user_id: Uuid, t: i64) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            video_id,
            user_id,
            content: "Keep your elbow up".to_string(),
            created_at: at(t),
            updated_at: at(t),
        }
    }

    fn view(video_id: Uuid, user_id: Option<Uuid>, t: i64) -> View {
        View {
            id: Uuid::new_v4(),
            video_id,
            user_id,
            user_agent: None,
            created_at: at(t),
        }
    }

    #[test]
    fn test_merge_orders_by_timestamp_not_kind() {
        let (video_a, video_b) = (Uuid::new_v4(), Uuid::new_v4());
        let coach = Uuid::new_v4();
        let lookup = ActivityLookup::new(
            &[AuthorProfile {
                user_id: coach,
                display_name: Some("Coach Kim".to_string()),
                avatar_url: None,
                role: crate::models::Role::Coach,
            }],
            [(video_a, "A".to_string()), (video_b, "B".to_string())],
        );

        let feed = merge_activity(
            &[like(video_b, coach, 10)],
            &[comment(video_a, coach, 5)],
            &[view(video_b, Some(coach), 15)],
            &lookup,
        );

        let kinds: Vec<ActivityKind> = feed.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![ActivityKind::View, ActivityKind::Like, ActivityKind::Comment]
        );
        assert_eq!(feed[0].video_title.as_deref(), Some("B"));
        assert_eq!(feed[2].video_title.as_deref(), Some("A"));
        assert_eq!(feed[1].user_name.as_deref(), Some("Coach Kim"));
        assert_eq!(feed[1].action, "liked your video");
    }

    #[test]
    fn test_merge_truncates_to_limit() {
        let video = Uuid::new_v4();
        let user = Uuid::new_v4();
        let likes: Vec<Like> = (0..5).map(|t| like(video, user, t)).collect();
        let views: Vec<View> = (10..15).map(|t| view(video, None, t)).collect();

        let feed = merge_activity(&likes, &[], &views, &ActivityLookup::default());

        assert_eq!(feed.len(), ACTIVITY_FEED_LIMIT);
        assert!(feed.windows(2).all(|w| w[0].created_at > w[1].created_at));
        assert!(feed.iter().all(|i| i.kind == ActivityKind::View));
    }

    #[test]
    fn test_missing_profile_and_anonymous_view_fall_back() {
        let video = Uuid::new_v4();
        let feed = merge_activity(
            &[like(video, Uuid::new_v4(), 1)],
            &[],
            &[view(video, None, 2)],
            &ActivityLookup::default(),
        );

        assert!(feed
            .iter()
            .all(|i| i.user_name.as_deref() == Some(ANONYMOUS_NAME)));
        assert!(feed.iter().all(|i| i.video_title.is_none()));
    }

    #[test]
    fn test_activity_kind_serializes_as_type() {
        let item = ActivityItem {
            id: Uuid::new_v4(),
            kind: ActivityKind::Comment,
            action: ActivityKind::Comment.action().to_string(),
            video_title: None,
            user_name: None,
            created_at: at(0),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "comment");
    }
}
