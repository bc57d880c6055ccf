// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video model and its denormalized feed shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AuthorProfile, SkillLevel, Sport};

/// Video metadata row stored in the `videos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    /// Owner's user ID
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Public URL of the uploaded file
    pub video_url: String,
    #[serde(default)]
    pub sport: Option<Sport>,
    #[serde(default)]
    pub skill_level: Option<SkillLevel>,
    /// Only coaches (and the owner) may see the video
    #[serde(default)]
    pub is_coaches_only: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Video with author profile and engagement counts, as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedVideo {
    #[serde(flatten)]
    pub video: Video,
    /// Author profile (None if the profile row is missing)
    pub profiles: Option<AuthorProfile>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub views_count: u64,
    /// Whether the signed-in user liked this video
    pub user_liked: bool,
}

impl FeedVideo {
    /// Flip the like state locally, adjusting the count to match.
    ///
    /// Returns the new liked state. This is a view overlay only.
    pub fn toggle_like_local(&mut self) -> bool {
        if self.user_liked {
            self.likes_count = self.likes_count.saturating_sub(1);
            self.user_liked = false;
        } else {
            self.likes_count += 1;
            self.user_liked = true;
        }
        self.user_liked
    }
}

/// Compact video reference attached to owner comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub sport: Option<Sport>,
    #[serde(default)]
    pub skill_level: Option<SkillLevel>,
    pub video_url: String,
}

/// User-provided details for a new upload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewVideoDetails {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: String,
    pub sport: Sport,
    pub skill_level: SkillLevel,
    pub is_coaches_only: bool,
}

/// Row inserted into `videos` after the file upload.
#[derive(Debug, Clone, Serialize)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub sport: Sport,
    pub skill_level: SkillLevel,
    pub is_coaches_only: bool,
}

impl NewVideo {
    pub fn new(user_id: Uuid, video_url: String, details: NewVideoDetails) -> Self {
        Self {
            user_id,
            title: details.title,
            description: details.description,
            video_url,
            sport: details.sport,
            skill_level: details.skill_level,
            is_coaches_only: details.is_coaches_only,
        }
    }
}

/// Owner edit of title/description.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct VideoEdit {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: String,
}
