// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod dashboard;
pub mod engagement;
pub mod profile;
pub mod video;

pub use dashboard::{
    merge_activity, ActivityItem, ActivityKind, ActivityLookup, DashboardData, DashboardStats,
    RecentVideo, ACTIVITY_FEED_LIMIT, ANONYMOUS_NAME,
};
pub use engagement::{
    Comment, CommentWithAuthor, Like, NewComment, NewLike, NewView, OwnerComment, View,
};
pub use profile::{AuthorProfile, Profile, ProfileUpdate, Role, SkillLevel, Sport};
pub use video::{FeedVideo, NewVideo, NewVideoDetails, Video, VideoEdit, VideoSummary};
