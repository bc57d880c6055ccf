// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Comment accessors.
//!
//! [`CommentThread`] follows one video (oldest first); [`OwnerComments`]
//! collects feedback across a set of the owner's videos (newest first).
//! Both attach commenter profiles from one batched profile lookup.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::Session;
use crate::db::{tables, Backend, ChangeTopic, Db, Filter};
use crate::error::{AppError, Result};
use crate::models::{
    AuthorProfile, Comment, CommentWithAuthor, NewComment, OwnerComment, VideoSummary,
};
use crate::services::live::{self, LiveHandle, Refresh};
use crate::services::store::{Loadable, Store};
use crate::services::Notifier;
use crate::Client;

/// Join comments with their authors' profiles in one batched lookup.
async fn with_authors<B: Backend>(db: &Db<B>, comments: Vec<Comment>) -> Result<Vec<CommentWithAuthor>> {
    let authors: Vec<Uuid> = comments
        .iter()
        .map(|c| c.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if authors.is_empty() {
        return Ok(Vec::new());
    }

    let profiles: HashMap<Uuid, AuthorProfile> = db
        .author_profiles(&authors)
        .await?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();

    Ok(comments
        .into_iter()
        .map(|comment| CommentWithAuthor {
            profiles: profiles.get(&comment.user_id).cloned(),
            comment,
        })
        .collect())
}

// ─── Single Video ────────────────────────────────────────────────

pub struct CommentThread<B> {
    video_id: Uuid,
    db: Db<B>,
    session: Session,
    notifier: Notifier,
    store: Store<Vec<CommentWithAuthor>>,
}

impl<B: Backend> CommentThread<B> {
    pub fn new(client: &Client<B>, video_id: Uuid) -> Self {
        Self {
            video_id,
            db: client.db.clone(),
            session: client.session.clone(),
            notifier: client.notifier.clone(),
            store: Store::new(Vec::new()),
        }
    }

    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    pub fn state(&self) -> Loadable<Vec<CommentWithAuthor>> {
        self.store.snapshot()
    }

    pub fn comments(&self) -> Vec<CommentWithAuthor> {
        self.store.data()
    }

    pub fn watch(&self) -> watch::Receiver<Loadable<Vec<CommentWithAuthor>>> {
        self.store.watch()
    }

    pub fn topics(&self) -> Vec<ChangeTopic> {
        vec![ChangeTopic::filtered(
            tables::COMMENTS,
            Filter::eq("video_id", self.video_id),
        )]
    }

    pub async fn load(&self) -> Result<Vec<CommentWithAuthor>> {
        let comments = self.db.comments_for_video(self.video_id).await?;
        with_authors(&self.db, comments).await
    }

    pub async fn refresh(&self) {
        let ticket = self.store.begin();
        match self.load().await {
            Ok(comments) => {
                self.store.commit(ticket, comments);
            }
            Err(e) => {
                tracing::error!(error = %e, video_id = %self.video_id, "Error fetching comments");
                if self.store.finish(ticket) {
                    self.notifier.error("Failed to load comments");
                }
            }
        }
    }

    /// Post a comment as the signed-in user and append it locally.
    pub async fn add_comment(&self, content: &str) {
        let Some(user_id) = self.session.user_id() else {
            return;
        };

        let result = async {
            let comment = self
                .db
                .insert_comment(&NewComment {
                    video_id: self.video_id,
                    user_id,
                    content: content.to_string(),
                })
                .await?;
            let profiles = self.db.author_profiles(&[user_id]).await?;
            Ok::<_, AppError>(CommentWithAuthor {
                comment,
                profiles: profiles.into_iter().next(),
            })
        }
        .await;

        match result {
            Ok(comment) => {
                self.store.modify(|comments| {
                    if !comments.iter().any(|c| c.comment.id == comment.comment.id) {
                        comments.push(comment);
                    }
                });
                self.notifier.success("Comment added successfully");
            }
            Err(e) => {
                tracing::error!(error = %e, video_id = %self.video_id, "Error adding comment");
                self.notifier.error("Failed to add comment");
            }
        }
    }

    /// Delete one of the signed-in user's comments.
    pub async fn delete_comment(&self, comment_id: Uuid) {
        let Some(user_id) = self.session.user_id() else {
            return;
        };

        match self.db.delete_comment(comment_id, user_id).await {
            Ok(()) => {
                self.store
                    .modify(|comments| comments.retain(|c| c.comment.id != comment_id));
                self.notifier.success("Comment deleted successfully");
            }
            Err(e) => {
                tracing::error!(error = %e, comment_id = %comment_id, "Error deleting comment");
                self.notifier.error("Failed to delete comment");
            }
        }
    }

    pub async fn mount(self: &Arc<Self>) -> Result<LiveHandle> {
        live::mount(&self.db, self.topics(), self.clone(), self.session.watch()).await
    }
}

impl<B: Backend> Refresh for CommentThread<B> {
    async fn refresh(&self) {
        CommentThread::refresh(self).await
    }

    fn invalidate(&self) {
        self.store.invalidate();
    }
}

// ─── Owner Aggregate ─────────────────────────────────────────────

pub struct OwnerComments<B> {
    video_ids: Vec<Uuid>,
    db: Db<B>,
    session: Session,
    notifier: Notifier,
    store: Store<Vec<OwnerComment>>,
}

impl<B: Backend> OwnerComments<B> {
    pub fn new(client: &Client<B>, video_ids: Vec<Uuid>) -> Self {
        Self {
            video_ids,
            db: client.db.clone(),
            session: client.session.clone(),
            notifier: client.notifier.clone(),
            store: Store::new(Vec::new()),
        }
    }

    pub fn state(&self) -> Loadable<Vec<OwnerComment>> {
        self.store.snapshot()
    }

    pub fn comments(&self) -> Vec<OwnerComment> {
        self.store.data()
    }

    pub fn watch(&self) -> watch::Receiver<Loadable<Vec<OwnerComment>>> {
        self.store.watch()
    }

    pub fn topics(&self) -> Vec<ChangeTopic> {
        vec![ChangeTopic::filtered(
            tables::COMMENTS,
            Filter::in_list("video_id", &self.video_ids),
        )]
    }

    /// Fetch comments across the video set. No query for an empty set.
    pub async fn load(&self) -> Result<Vec<OwnerComment>> {
        if self.video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let (comments, summaries) = tokio::try_join!(
            self.db.comments_for_videos(&self.video_ids),
            self.db.video_summaries(&self.video_ids),
        )?;
        let summaries: HashMap<Uuid, VideoSummary> =
            summaries.into_iter().map(|s| (s.id, s)).collect();

        Ok(with_authors(&self.db, comments)
            .await?
            .into_iter()
            .map(|comment| OwnerComment {
                video: summaries.get(&comment.comment.video_id).cloned(),
                comment,
            })
            .collect())
    }

    pub async fn refresh(&self) {
        let ticket = self.store.begin();
        match self.load().await {
            Ok(comments) => {
                self.store.commit(ticket, comments);
            }
            Err(e) => {
                tracing::error!(error = %e, videos = self.video_ids.len(), "Error fetching owner comments");
                if self.store.finish(ticket) {
                    self.notifier.error("Failed to load comments");
                }
            }
        }
    }

    pub async fn mount(self: &Arc<Self>) -> Result<LiveHandle> {
        live::mount(&self.db, self.topics(), self.clone(), self.session.watch()).await
    }
}

impl<B: Backend> Refresh for OwnerComments<B> {
    async fn refresh(&self) {
        OwnerComments::refresh(self).await
    }

    fn invalidate(&self) {
        self.store.invalidate();
    }
}
