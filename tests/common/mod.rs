// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, TimeZone, Utc};
use courtside::auth::{AuthUser, Session};
use courtside::config::Config;
use courtside::db::{tables, MemoryBackend};
use courtside::services::Notice;
use courtside::time_utils::format_utc_rfc3339_micros;
use courtside::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Base instant for seeded timestamps.
const EPOCH: i64 = 1_700_000_000;

/// Timestamp `secs` seconds after the test epoch.
#[allow(dead_code)]
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH + secs, 0)
        .single()
        .expect("valid timestamp")
}

#[allow(dead_code)]
pub fn stamp(secs: i64) -> String {
    format_utc_rfc3339_micros(at(secs))
}

/// Client over a fresh in-memory backend, signed in as a new user.
#[allow(dead_code)]
pub fn signed_in_client() -> (Arc<MemoryBackend>, Client<MemoryBackend>, Uuid) {
    let user_id = Uuid::new_v4();
    let backend = Arc::new(MemoryBackend::new());
    let session = Session::signed_in(AuthUser {
        id: user_id,
        email: Some("athlete@example.com".to_string()),
        access_token: "test-access-token".to_string(),
    });
    let client = Client::new(Config::test_default(), backend.clone(), session);
    (backend, client, user_id)
}

/// Client with nobody signed in.
#[allow(dead_code)]
pub fn anonymous_client() -> (Arc<MemoryBackend>, Client<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let client = Client::new(Config::test_default(), backend.clone(), Session::anonymous());
    (backend, client)
}

#[allow(dead_code)]
pub fn seed_profile(backend: &MemoryBackend, user_id: Uuid, name: &str, role: &str) {
    backend.seed(
        tables::PROFILES,
        json!({
            "user_id": user_id,
            "display_name": name,
            "role": role,
        }),
    );
}

#[allow(dead_code)]
pub fn seed_video(
    backend: &MemoryBackend,
    owner: Uuid,
    title: &str,
    created: i64,
    coaches_only: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    backend.seed(
        tables::VIDEOS,
        json!({
            "id": id,
            "user_id": owner,
            "title": title,
            "video_url": format!("https://cdn.example.com/{}.mp4", id),
            "sport": "tennis",
            "skill_level": "L2",
            "is_coaches_only": coaches_only,
            "created_at": stamp(created),
            "updated_at": stamp(created),
        }),
    );
    id
}

#[allow(dead_code)]
pub fn seed_like(backend: &MemoryBackend, video_id: Uuid, user_id: Uuid, created: i64) {
    backend.seed(
        tables::LIKES,
        json!({ "video_id": video_id, "user_id": user_id, "created_at": stamp(created) }),
    );
}

#[allow(dead_code)]
pub fn seed_comment(
    backend: &MemoryBackend,
    video_id: Uuid,
    user_id: Uuid,
    content: &str,
    created: i64,
) -> Uuid {
    let id = Uuid::new_v4();
    backend.seed(
        tables::COMMENTS,
        json!({
            "id": id,
            "video_id": video_id,
            "user_id": user_id,
            "content": content,
            "created_at": stamp(created),
        }),
    );
    id
}

#[allow(dead_code)]
pub fn seed_view(backend: &MemoryBackend, video_id: Uuid, user_id: Option<Uuid>, created: i64) {
    backend.seed(
        tables::VIDEO_VIEWS,
        json!({ "video_id": video_id, "user_id": user_id, "created_at": stamp(created) }),
    );
}

#[allow(dead_code)]
pub fn seed_reward(backend: &MemoryBackend, athlete_id: Uuid) {
    backend.seed(
        tables::REWARDS,
        json!({ "athlete_id": athlete_id, "coach_id": Uuid::new_v4() }),
    );
}

/// Let spawned feed and refresh tasks run.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Every notice queued on `rx`.
#[allow(dead_code)]
pub fn drain_notices(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}
