// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations over a [`Backend`].
//!
//! Provides high-level operations for:
//! - Profiles (identity details, roles, author lookups)
//! - Videos (ownership, visibility, titles)
//! - Likes, comments and views (counts, recent rows, mutations)
//! - Rewards (counts)
//! - Object storage and change-feed pass-through

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{buckets, tables, Backend, ChangeTopic, Direction, Filter, Query, Subscription};
use crate::error::Result;
use crate::models::{
    AuthorProfile, Comment, Like, NewComment, NewLike, NewVideo, NewView, Profile, ProfileUpdate,
    Role, Video, VideoEdit, VideoSummary, View,
};

const AUTHOR_COLUMNS: &str = "user_id, display_name, avatar_url, role";
const SUMMARY_COLUMNS: &str = "id, title, sport, skill_level, video_url";
const CREATED_AT: &str = "created_at";

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Deserialize)]
struct TitleRow {
    id: Uuid,
    title: String,
}

#[derive(Deserialize)]
struct RoleRow {
    #[serde(default)]
    role: Role,
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

/// Typed database handle shared by all services.
pub struct Db<B> {
    backend: Arc<B>,
}

impl<B> Clone for Db<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: Backend> Db<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // ─── Helpers ───────────────────────────────────────────────────

    async fn fetch<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>> {
        self.backend
            .select(&query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn fetch_one<T: DeserializeOwned>(&self, query: Query) -> Result<Option<T>> {
        Ok(self.fetch(query.limit(1)).await?.into_iter().next())
    }

    async fn insert_row<N: Serialize, T: DeserializeOwned>(&self, table: &str, row: &N) -> Result<T> {
        let stored = self.backend.insert(table, serde_json::to_value(row)?).await?;
        decode(stored)
    }

    async fn count_for_video(&self, table: &str, video_id: Uuid) -> Result<u64> {
        self.backend
            .count(&Query::table(table).eq("video_id", video_id))
            .await
    }

    async fn count_for_videos(&self, table: &str, video_ids: &[Uuid]) -> Result<u64> {
        self.backend
            .count(&Query::table(table).in_list("video_id", video_ids))
            .await
    }

    async fn recent_for_videos<T: DeserializeOwned>(
        &self,
        table: &str,
        video_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<T>> {
        self.fetch(
            Query::table(table)
                .in_list("video_id", video_ids)
                .order_by(CREATED_AT, Direction::Descending)
                .limit(limit),
        )
        .await
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get the profile for an auth user.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.fetch_one(Query::table(tables::PROFILES).eq("user_id", user_id))
            .await
    }

    /// Get a user's role (None if they have no profile yet).
    pub async fn get_role(&self, user_id: Uuid) -> Result<Option<Role>> {
        let row: Option<RoleRow> = self
            .fetch_one(
                Query::table(tables::PROFILES)
                    .select("role")
                    .eq("user_id", user_id),
            )
            .await?;
        Ok(row.map(|r| r.role))
    }

    /// Batch-fetch author profiles for a set of users.
    pub async fn author_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<AuthorProfile>> {
        self.fetch(
            Query::table(tables::PROFILES)
                .select(AUTHOR_COLUMNS)
                .in_list("user_id", user_ids),
        )
        .await
    }

    /// Patch the caller's profile row.
    pub async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<()> {
        self.backend
            .update(
                &Query::table(tables::PROFILES).eq("user_id", user_id),
                serde_json::to_value(update)?,
            )
            .await
    }

    /// Create the caller's profile row, or merge into it if it exists.
    pub async fn upsert_profile(&self, user_id: Uuid, fields: &ProfileUpdate) -> Result<Profile> {
        let mut row = serde_json::to_value(fields)?;
        if let Value::Object(map) = &mut row {
            map.insert("user_id".to_string(), Value::String(user_id.to_string()));
        }
        let stored = self.backend.upsert(tables::PROFILES, "user_id", row).await?;
        decode(stored)
    }

    // ─── Video Operations ────────────────────────────────────────

    /// IDs of every video a user owns.
    pub async fn video_ids_for_owner(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let rows: Vec<IdRow> = self
            .fetch(
                Query::table(tables::VIDEOS)
                    .select("id")
                    .eq("user_id", user_id),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    /// A user's videos, newest first, optionally limited.
    pub async fn videos_for_owner(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<Video>> {
        let query = Query::table(tables::VIDEOS)
            .eq("user_id", user_id)
            .order_by(CREATED_AT, Direction::Descending);
        let query = match limit {
            Some(n) => query.limit(n),
            None => query,
        };
        self.fetch(query).await
    }

    /// Videos visible to a viewer, newest first.
    ///
    /// Coaches see everything; athletes see public videos and their own.
    pub async fn visible_videos(&self, viewer: Uuid, role: Role) -> Result<Vec<Video>> {
        let query = Query::table(tables::VIDEOS).order_by(CREATED_AT, Direction::Descending);
        let query = match role {
            Role::Coach => query,
            Role::Athlete => query.any_of(vec![
                Filter::eq("is_coaches_only", false),
                Filter::eq("user_id", viewer),
            ]),
        };
        self.fetch(query).await
    }

    /// `(id, title)` pairs for a set of videos.
    pub async fn video_titles(&self, video_ids: &[Uuid]) -> Result<Vec<(Uuid, String)>> {
        let rows: Vec<TitleRow> = self
            .fetch(
                Query::table(tables::VIDEOS)
                    .select("id, title")
                    .in_list("id", video_ids),
            )
            .await?;
        Ok(rows.into_iter().map(|r| (r.id, r.title)).collect())
    }

    /// Compact summaries for a set of videos.
    pub async fn video_summaries(&self, video_ids: &[Uuid]) -> Result<Vec<VideoSummary>> {
        self.fetch(
            Query::table(tables::VIDEOS)
                .select(SUMMARY_COLUMNS)
                .in_list("id", video_ids),
        )
        .await
    }

    pub async fn insert_video(&self, video: &NewVideo) -> Result<Video> {
        self.insert_row(tables::VIDEOS, video).await
    }

    /// Edit title/description of a video the caller owns.
    pub async fn update_video(&self, video_id: Uuid, owner: Uuid, edit: &VideoEdit) -> Result<()> {
        self.backend
            .update(
                &Query::table(tables::VIDEOS)
                    .eq("id", video_id)
                    .eq("user_id", owner),
                serde_json::to_value(edit)?,
            )
            .await
    }

    /// Delete a video the caller owns.
    pub async fn delete_video(&self, video_id: Uuid, owner: Uuid) -> Result<()> {
        self.backend
            .delete(
                &Query::table(tables::VIDEOS)
                    .eq("id", video_id)
                    .eq("user_id", owner),
            )
            .await
    }

    // ─── Like Operations ─────────────────────────────────────────

    pub async fn count_likes_for_video(&self, video_id: Uuid) -> Result<u64> {
        self.count_for_video(tables::LIKES, video_id).await
    }

    pub async fn count_likes_for_videos(&self, video_ids: &[Uuid]) -> Result<u64> {
        self.count_for_videos(tables::LIKES, video_ids).await
    }

    pub async fn recent_likes(&self, video_ids: &[Uuid], limit: usize) -> Result<Vec<Like>> {
        self.recent_for_videos(tables::LIKES, video_ids, limit).await
    }

    /// Whether `user_id` has liked `video_id`.
    pub async fn has_liked(&self, video_id: Uuid, user_id: Uuid) -> Result<bool> {
        let row: Option<IdRow> = self
            .fetch_one(
                Query::table(tables::LIKES)
                    .select("id")
                    .eq("video_id", video_id)
                    .eq("user_id", user_id),
            )
            .await?;
        Ok(row.is_some())
    }

    pub async fn insert_like(&self, video_id: Uuid, user_id: Uuid) -> Result<Like> {
        self.insert_row(tables::LIKES, &NewLike { video_id, user_id })
            .await
    }

    pub async fn delete_like(&self, video_id: Uuid, user_id: Uuid) -> Result<()> {
        self.backend
            .delete(
                &Query::table(tables::LIKES)
                    .eq("video_id", video_id)
                    .eq("user_id", user_id),
            )
            .await
    }

    // ─── Comment Operations ──────────────────────────────────────

    pub async fn count_comments_for_video(&self, video_id: Uuid) -> Result<u64> {
        self.count_for_video(tables::COMMENTS, video_id).await
    }

    pub async fn count_comments_for_videos(&self, video_ids: &[Uuid]) -> Result<u64> {
        self.count_for_videos(tables::COMMENTS, video_ids).await
    }

    pub async fn recent_comments(&self, video_ids: &[Uuid], limit: usize) -> Result<Vec<Comment>> {
        self.recent_for_videos(tables::COMMENTS, video_ids, limit)
            .await
    }

    /// Comments on one video, oldest first.
    pub async fn comments_for_video(&self, video_id: Uuid) -> Result<Vec<Comment>> {
        self.fetch(
            Query::table(tables::COMMENTS)
                .eq("video_id", video_id)
                .order_by(CREATED_AT, Direction::Ascending),
        )
        .await
    }

    /// Comments across several videos, newest first.
    pub async fn comments_for_videos(&self, video_ids: &[Uuid]) -> Result<Vec<Comment>> {
        self.fetch(
            Query::table(tables::COMMENTS)
                .in_list("video_id", video_ids)
                .order_by(CREATED_AT, Direction::Descending),
        )
        .await
    }

    pub async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.insert_row(tables::COMMENTS, comment).await
    }

    /// Delete a comment authored by `user_id`.
    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> Result<()> {
        self.backend
            .delete(
                &Query::table(tables::COMMENTS)
                    .eq("id", comment_id)
                    .eq("user_id", user_id),
            )
            .await
    }

    // ─── View Operations ─────────────────────────────────────────

    pub async fn count_views_for_video(&self, video_id: Uuid) -> Result<u64> {
        self.count_for_video(tables::VIDEO_VIEWS, video_id).await
    }

    pub async fn count_views_for_videos(&self, video_ids: &[Uuid]) -> Result<u64> {
        self.count_for_videos(tables::VIDEO_VIEWS, video_ids).await
    }

    pub async fn recent_views(&self, video_ids: &[Uuid], limit: usize) -> Result<Vec<View>> {
        self.recent_for_videos(tables::VIDEO_VIEWS, video_ids, limit)
            .await
    }

    pub async fn insert_view(&self, view: &NewView) -> Result<View> {
        self.insert_row(tables::VIDEO_VIEWS, view).await
    }

    // ─── Reward Operations ───────────────────────────────────────

    /// Rewards received by an athlete.
    pub async fn count_rewards_for_athlete(&self, athlete_id: Uuid) -> Result<u64> {
        self.backend
            .count(&Query::table(tables::REWARDS).eq("athlete_id", athlete_id))
            .await
    }

    // ─── Storage ─────────────────────────────────────────────────

    /// Upload a video file and return its public URL.
    pub async fn upload_video_file(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        self.backend
            .upload(buckets::VIDEOS, path, bytes, content_type, false)
            .await?;
        Ok(self.backend.public_url(buckets::VIDEOS, path))
    }

    /// Upload (or replace) an avatar and return its public URL.
    pub async fn upload_avatar(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.backend
            .upload(buckets::AVATARS, path, bytes, content_type, true)
            .await?;
        Ok(self.backend.public_url(buckets::AVATARS, path))
    }

    // ─── Session & Change Feed ───────────────────────────────────

    pub async fn sign_out(&self) -> Result<()> {
        self.backend.sign_out().await
    }

    pub async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription> {
        self.backend.subscribe(topic).await
    }
}
