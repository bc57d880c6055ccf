// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend layer: the row store, object storage, auth and change feed.
//!
//! [`Backend`] is the raw boundary; [`Db`] layers typed per-entity operations
//! on top of it and is what services use.

pub mod changes;
pub mod client;
pub mod memory;
pub mod query;
pub mod realtime;
pub mod rest;

use serde_json::Value;
use std::future::Future;

use crate::error::Result;

pub use changes::{ChangeEvent, ChangeKind, ChangeTopic, Subscription};
pub use client::Db;
pub use memory::MemoryBackend;
pub use query::{Direction, Filter, Query};
pub use rest::RestBackend;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const VIDEOS: &str = "videos";
    pub const LIKES: &str = "likes";
    pub const COMMENTS: &str = "comments";
    pub const VIDEO_VIEWS: &str = "video_views";
    /// Rewards granted to athletes (keyed by `athlete_id`)
    pub const REWARDS: &str = "rewards";
}

/// Object storage bucket names.
pub mod buckets {
    pub const VIDEOS: &str = "videos";
    pub const AVATARS: &str = "avatars";
}

/// Backend-as-a-service boundary.
///
/// Rows travel as JSON; [`Db`] handles (de)serialization.
pub trait Backend: Send + Sync + 'static {
    /// Fetch matching rows.
    fn select(&self, query: &Query) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Count matching rows without fetching them.
    fn count(&self, query: &Query) -> impl Future<Output = Result<u64>> + Send;

    /// Insert a row and return it as stored.
    fn insert(&self, table: &str, row: Value) -> impl Future<Output = Result<Value>> + Send;

    /// Patch every matching row.
    fn update(&self, query: &Query, patch: Value) -> impl Future<Output = Result<()>> + Send;

    /// Delete every matching row.
    fn delete(&self, query: &Query) -> impl Future<Output = Result<()>> + Send;

    /// Insert or merge a row on its `conflict` column and return it as stored.
    fn upsert(
        &self,
        table: &str,
        conflict: &str,
        row: Value,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// Store a blob at `bucket/path`.
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Public URL of a stored blob.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// End the backend session for the current access token.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// Open a change-feed subscription.
    fn subscribe(&self, topic: ChangeTopic) -> impl Future<Output = Result<Subscription>> + Send;
}
