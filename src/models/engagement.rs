// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Engagement rows: likes, comments and view events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AuthorProfile, VideoSummary};

/// Row in `likes` (unique per user + video).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Row in `comments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Row in `video_views`, one per playback start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: Uuid,
    pub video_id: Uuid,
    /// None for anonymous viewers
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `likes`.
#[derive(Debug, Clone, Serialize)]
pub struct NewLike {
    pub video_id: Uuid,
    pub user_id: Uuid,
}

/// Insert payload for `comments`.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

/// Insert payload for `video_views`.
#[derive(Debug, Clone, Serialize)]
pub struct NewView {
    pub video_id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Comment joined with its author's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub profiles: Option<AuthorProfile>,
}

/// Comment on one of the owner's videos, for the feedback review page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerComment {
    #[serde(flatten)]
    pub comment: CommentWithAuthor,
    /// None if the video row disappeared between queries
    pub video: Option<VideoSummary>,
}
