// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregator.
//!
//! Builds the signed-in user's summary counters, most recent videos and the
//! merged recent-activity feed, and keeps them current from the change feed.
//!
//! Every fetch recomputes everything from row counts; nothing is patched
//! incrementally.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::Session;
use crate::db::{tables, Backend, ChangeTopic, Db, Filter};
use crate::error::Result;
use crate::models::{
    merge_activity, ActivityItem, ActivityLookup, DashboardData, DashboardStats, RecentVideo,
};
use crate::services::live::{self, LiveHandle, Refresh};
use crate::services::store::{Loadable, Store};
use crate::services::Notifier;
use crate::Client;

/// Videos shown in the "recent videos" panel.
pub const RECENT_VIDEOS_LIMIT: usize = 3;

/// Rows fetched per source (likes, comments, views) before merging.
pub const ACTIVITY_SOURCE_LIMIT: usize = 5;

pub struct Dashboard<B> {
    db: Db<B>,
    session: Session,
    notifier: Notifier,
    store: Store<DashboardData>,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(client: &Client<B>) -> Self {
        Self {
            db: client.db.clone(),
            session: client.session.clone(),
            notifier: client.notifier.clone(),
            store: Store::new(DashboardData::default()),
        }
    }

    pub fn state(&self) -> Loadable<DashboardData> {
        self.store.snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<Loadable<DashboardData>> {
        self.store.watch()
    }

    /// Change-feed topics that invalidate a user's dashboard.
    ///
    /// Only the videos topic is scoped to the user; likes, comments and
    /// views are watched table-wide.
    pub fn topics(user_id: Uuid) -> Vec<ChangeTopic> {
        vec![
            ChangeTopic::filtered(tables::VIDEOS, Filter::eq("user_id", user_id)),
            ChangeTopic::table(tables::LIKES),
            ChangeTopic::table(tables::COMMENTS),
            ChangeTopic::table(tables::VIDEO_VIEWS),
        ]
    }

    /// Fetch the full dashboard for `user_id`.
    ///
    /// Any rejected query fails the whole load.
    pub async fn load(&self, user_id: Uuid) -> Result<DashboardData> {
        let video_ids = self.db.video_ids_for_owner(user_id).await?;

        if video_ids.is_empty() {
            let rewards_count = self.db.count_rewards_for_athlete(user_id).await?;
            return Ok(DashboardData {
                stats: DashboardStats {
                    rewards_count,
                    ..DashboardStats::default()
                },
                ..DashboardData::default()
            });
        }

        let (likes_count, comments_count, views_count, rewards_count, recent_videos, recent_activity) =
            tokio::try_join!(
                self.db.count_likes_for_videos(&video_ids),
                self.db.count_comments_for_videos(&video_ids),
                self.db.count_views_for_videos(&video_ids),
                self.db.count_rewards_for_athlete(user_id),
                self.recent_videos(user_id),
                self.recent_activity(&video_ids),
            )?;

        Ok(DashboardData {
            stats: DashboardStats {
                videos_count: video_ids.len() as u64,
                likes_count,
                comments_count,
                views_count,
                rewards_count,
            },
            recent_videos,
            recent_activity,
        })
    }

    /// Newest videos, each with its own view count query.
    async fn recent_videos(&self, user_id: Uuid) -> Result<Vec<RecentVideo>> {
        let videos = self
            .db
            .videos_for_owner(user_id, Some(RECENT_VIDEOS_LIMIT))
            .await?;

        let views = futures_util::future::try_join_all(
            videos
                .iter()
                .map(|video| self.db.count_views_for_video(video.id)),
        )
        .await?;

        Ok(videos
            .into_iter()
            .zip(views)
            .map(|(video, views)| RecentVideo { video, views })
            .collect())
    }

    async fn recent_activity(&self, video_ids: &[Uuid]) -> Result<Vec<ActivityItem>> {
        let (likes, comments, views) = tokio::try_join!(
            self.db.recent_likes(video_ids, ACTIVITY_SOURCE_LIMIT),
            self.db.recent_comments(video_ids, ACTIVITY_SOURCE_LIMIT),
            self.db.recent_views(video_ids, ACTIVITY_SOURCE_LIMIT),
        )?;

        let actors: BTreeSet<Uuid> = likes
            .iter()
            .map(|l| l.user_id)
            .chain(comments.iter().map(|c| c.user_id))
            .chain(views.iter().filter_map(|v| v.user_id))
            .collect();
        let actors: Vec<Uuid> = actors.into_iter().collect();

        let (profiles, titles) = tokio::try_join!(
            async {
                if actors.is_empty() {
                    Ok(Vec::new())
                } else {
                    self.db.author_profiles(&actors).await
                }
            },
            self.db.video_titles(video_ids),
        )?;

        let lookup = ActivityLookup::new(&profiles, titles);
        Ok(merge_activity(&likes, &comments, &views, &lookup))
    }

    /// Reload for the signed-in user; failures keep the previous data.
    pub async fn refresh(&self) {
        let Some(user_id) = self.session.user_id() else {
            self.store.reset(DashboardData::default());
            return;
        };

        let ticket = self.store.begin();
        match self.load(user_id).await {
            Ok(data) => {
                tracing::debug!(
                    user_id = %user_id,
                    videos = data.stats.videos_count,
                    activity = data.recent_activity.len(),
                    "Dashboard loaded"
                );
                if !self.store.commit(ticket, data) {
                    tracing::debug!(user_id = %user_id, "Discarding stale dashboard fetch");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Error fetching dashboard data");
                if self.store.finish(ticket) {
                    self.notifier.error("Failed to load dashboard data");
                }
            }
        }
    }

    /// Load now and keep the dashboard live until the handle is dropped or
    /// the signed-in user changes.
    pub async fn mount(self: &Arc<Self>) -> Result<LiveHandle> {
        let user_id = self.session.require_user()?;
        live::mount(
            &self.db,
            Self::topics(user_id),
            self.clone(),
            self.session.watch(),
        )
        .await
    }
}

impl<B: Backend> Refresh for Dashboard<B> {
    async fn refresh(&self) {
        Dashboard::refresh(self).await
    }

    fn invalidate(&self) {
        self.store.invalidate();
    }
}
