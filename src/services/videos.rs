// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video feed: the role-scoped visible video set with engagement counts.
//!
//! Like toggles are optimistic. The local count and liked flag flip before
//! the backend call resolves, and the next re-fetch reconciles any
//! divergence (a race with another client, a rejected write).

use futures_util::future::try_join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Session;
use crate::db::{tables, Backend, ChangeTopic, Db};
use crate::error::Result;
use crate::models::{AuthorProfile, FeedVideo, NewComment, Video, VideoEdit};
use crate::services::live::{self, LiveHandle, Refresh};
use crate::services::store::{Loadable, Store};
use crate::services::Notifier;
use crate::Client;

pub struct VideoFeed<B> {
    db: Db<B>,
    session: Session,
    notifier: Notifier,
    store: Store<Vec<FeedVideo>>,
}

impl<B: Backend> VideoFeed<B> {
    pub fn new(client: &Client<B>) -> Self {
        Self {
            db: client.db.clone(),
            session: client.session.clone(),
            notifier: client.notifier.clone(),
            store: Store::new(Vec::new()),
        }
    }

    pub fn state(&self) -> Loadable<Vec<FeedVideo>> {
        self.store.snapshot()
    }

    pub fn videos(&self) -> Vec<FeedVideo> {
        self.store.data()
    }

    pub fn watch(&self) -> watch::Receiver<Loadable<Vec<FeedVideo>>> {
        self.store.watch()
    }

    pub fn topics() -> Vec<ChangeTopic> {
        vec![
            ChangeTopic::table(tables::VIDEOS),
            ChangeTopic::table(tables::LIKES),
            ChangeTopic::table(tables::COMMENTS),
        ]
    }

    /// Fetch the feed as seen by `viewer`.
    pub async fn load(&self, viewer: Uuid) -> Result<Vec<FeedVideo>> {
        let role = self.db.get_role(viewer).await?.unwrap_or_default();
        let videos = self.db.visible_videos(viewer, role).await?;
        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let owners: Vec<Uuid> = videos
            .iter()
            .map(|v| v.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let profiles: HashMap<Uuid, AuthorProfile> = self
            .db
            .author_profiles(&owners)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        try_join_all(
            videos
                .into_iter()
                .map(|video| self.with_counts(video, viewer, &profiles)),
        )
        .await
    }

    async fn with_counts(
        &self,
        video: Video,
        viewer: Uuid,
        profiles: &HashMap<Uuid, AuthorProfile>,
    ) -> Result<FeedVideo> {
        let (likes_count, comments_count, views_count, user_liked) = tokio::try_join!(
            self.db.count_likes_for_video(video.id),
            self.db.count_comments_for_video(video.id),
            self.db.count_views_for_video(video.id),
            self.db.has_liked(video.id, viewer),
        )?;

        Ok(FeedVideo {
            profiles: profiles.get(&video.user_id).cloned(),
            video,
            likes_count,
            comments_count,
            views_count,
            user_liked,
        })
    }

    pub async fn refresh(&self) {
        let Some(viewer) = self.session.user_id() else {
            self.store.reset(Vec::new());
            return;
        };

        let ticket = self.store.begin();
        match self.load(viewer).await {
            Ok(videos) => {
                tracing::debug!(user_id = %viewer, count = videos.len(), "Fetched videos");
                self.store.commit(ticket, videos);
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %viewer, "Error fetching videos");
                if self.store.finish(ticket) {
                    self.notifier.error("Failed to load videos");
                }
            }
        }
    }

    /// Like or unlike a video, updating local state first.
    ///
    /// Does nothing when signed out or when the video is not in the feed.
    pub async fn toggle_like(&self, video_id: Uuid) {
        let Some(user_id) = self.session.user_id() else {
            return;
        };

        let mut liked = None;
        self.store.modify(|videos| {
            liked = videos
                .iter_mut()
                .find(|v| v.video.id == video_id)
                .map(FeedVideo::toggle_like_local);
        });
        let Some(liked) = liked else {
            return;
        };

        let result = if liked {
            self.db.insert_like(video_id, user_id).await.map(|_| ())
        } else {
            self.db.delete_like(video_id, user_id).await
        };

        if let Err(e) = result {
            tracing::error!(error = %e, video_id = %video_id, liked, "Error toggling like");
            self.notifier.error("Failed to update like");
        }
    }

    /// Post a comment; the local count moves only once the insert succeeds.
    pub async fn add_comment(&self, video_id: Uuid, content: &str) {
        let Some(user_id) = self.session.user_id() else {
            return;
        };

        let comment = NewComment {
            video_id,
            user_id,
            content: content.to_string(),
        };
        match self.db.insert_comment(&comment).await {
            Ok(_) => {
                self.store.modify(|videos| {
                    if let Some(v) = videos.iter_mut().find(|v| v.video.id == video_id) {
                        v.comments_count += 1;
                    }
                });
                self.notifier.success("Comment added successfully");
            }
            Err(e) => {
                tracing::error!(error = %e, video_id = %video_id, "Error adding comment");
                self.notifier.error("Failed to add comment");
            }
        }
    }

    /// A user's videos, newest first (the signed-in user by default).
    ///
    /// Returns an empty list on failure or when nobody is specified.
    pub async fn user_videos(&self, user_id: Option<Uuid>) -> Vec<Video> {
        let Some(target) = user_id.or_else(|| self.session.user_id()) else {
            return Vec::new();
        };
        match self.db.videos_for_owner(target, None).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!(error = %e, user_id = %target, "Error fetching user videos");
                Vec::new()
            }
        }
    }

    /// Edit the title and description of one of the caller's videos.
    pub async fn update_video(&self, video_id: Uuid, edit: VideoEdit) -> Result<()> {
        let owner = self.session.require_user()?;
        let result: Result<()> = async {
            edit.validate()?;
            self.db.update_video(video_id, owner, &edit).await
        }
        .await;

        match result {
            Ok(()) => {
                self.store.modify(|videos| {
                    if let Some(v) = videos.iter_mut().find(|v| v.video.id == video_id) {
                        v.video.title = edit.title.clone();
                        v.video.description = Some(edit.description.clone());
                    }
                });
                self.notifier.success("Video updated successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, video_id = %video_id, "Error updating video");
                self.notifier.error("Failed to update video");
                Err(e)
            }
        }
    }

    /// Delete one of the caller's videos (other users' rows are untouched).
    pub async fn delete_video(&self, video_id: Uuid) -> Result<()> {
        let owner = self.session.require_user()?;
        match self.db.delete_video(video_id, owner).await {
            Ok(()) => {
                self.store
                    .modify(|videos| videos.retain(|v| v.video.id != video_id));
                self.notifier.success("Video deleted successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, video_id = %video_id, "Error deleting video");
                self.notifier.error("Failed to delete video");
                Err(e)
            }
        }
    }

    pub async fn mount(self: &Arc<Self>) -> Result<LiveHandle> {
        self.session.require_user()?;
        live::mount(&self.db, Self::topics(), self.clone(), self.session.watch()).await
    }
}

impl<B: Backend> Refresh for VideoFeed<B> {
    async fn refresh(&self) {
        VideoFeed::refresh(self).await
    }

    fn invalidate(&self) {
        self.store.invalidate();
    }
}
