// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregation and live refresh against the in-memory backend.

use courtside::db::memory::QueryOp;
use courtside::db::{tables, Backend};
use courtside::models::{ActivityKind, ACTIVITY_FEED_LIMIT, ANONYMOUS_NAME};
use courtside::services::{Dashboard, Variant};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::*;

const DAY: i64 = 86_400;

#[tokio::test]
async fn test_zero_videos_short_circuits() {
    let (backend, client, user_id) = signed_in_client();
    seed_reward(&backend, user_id);
    seed_reward(&backend, user_id);

    let dashboard = Dashboard::new(&client);
    dashboard.refresh().await;

    let state = dashboard.state();
    assert!(!state.loading);
    assert_eq!(state.data.stats.videos_count, 0);
    assert_eq!(state.data.stats.likes_count, 0);
    assert_eq!(state.data.stats.comments_count, 0);
    assert_eq!(state.data.stats.views_count, 0);
    assert_eq!(state.data.stats.rewards_count, 2);
    assert!(state.data.recent_videos.is_empty());
    assert!(state.data.recent_activity.is_empty());

    for table in [tables::LIKES, tables::COMMENTS, tables::VIDEO_VIEWS] {
        assert_eq!(backend.query_count(QueryOp::Count, table), 0, "{}", table);
        assert_eq!(backend.query_count(QueryOp::Select, table), 0, "{}", table);
    }
}

#[tokio::test]
async fn test_counts_match_rows() {
    let (backend, client, user_id) = signed_in_client();
    let video = seed_video(&backend, user_id, "Backhand", 0, false);
    let other_owner = Uuid::new_v4();
    let foreign = seed_video(&backend, other_owner, "Not mine", 0, false);

    for t in 0..3 {
        seed_like(&backend, video, Uuid::new_v4(), t);
    }
    seed_like(&backend, foreign, Uuid::new_v4(), 1);
    seed_comment(&backend, video, Uuid::new_v4(), "Nice", 2);
    seed_view(&backend, video, None, 3);
    seed_view(&backend, video, None, 4);

    let dashboard = Dashboard::new(&client);
    let data = dashboard.load(user_id).await.unwrap();

    assert_eq!(data.stats.videos_count, 1);
    assert_eq!(data.stats.likes_count, 3);
    assert_eq!(data.stats.comments_count, 1);
    assert_eq!(data.stats.views_count, 2);
    assert_eq!(data.recent_videos.len(), 1);
    assert_eq!(data.recent_videos[0].views, 2);
}

#[tokio::test]
async fn test_activity_and_recent_videos_order() {
    let (backend, client, user_id) = signed_in_client();
    let coach = Uuid::new_v4();
    seed_profile(&backend, coach, "Coach Kim", "coach");

    let video_a = seed_video(&backend, user_id, "A", -2 * DAY, false);
    let video_b = seed_video(&backend, user_id, "B", -DAY, false);
    seed_like(&backend, video_b, coach, 10);
    seed_comment(&backend, video_a, coach, "Watch your footwork", 5);
    seed_view(&backend, video_b, None, 15);

    let dashboard = Dashboard::new(&client);
    let data = dashboard.load(user_id).await.unwrap();

    let kinds: Vec<ActivityKind> = data.recent_activity.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![ActivityKind::View, ActivityKind::Like, ActivityKind::Comment]
    );
    assert_eq!(data.recent_activity[0].user_name.as_deref(), Some(ANONYMOUS_NAME));
    assert_eq!(data.recent_activity[1].user_name.as_deref(), Some("Coach Kim"));
    assert_eq!(data.recent_activity[1].video_title.as_deref(), Some("B"));
    assert_eq!(data.recent_activity[2].video_title.as_deref(), Some("A"));
    assert_eq!(data.recent_activity[2].action, "commented on your video");

    let recent: Vec<&str> = data
        .recent_videos
        .iter()
        .map(|v| v.video.title.as_str())
        .collect();
    assert_eq!(recent, vec!["B", "A"]);
}

#[tokio::test]
async fn test_activity_feed_is_capped_and_sorted() {
    let (backend, client, user_id) = signed_in_client();
    let video = seed_video(&backend, user_id, "Serve", 0, false);
    for t in 0..6 {
        seed_like(&backend, video, Uuid::new_v4(), 100 + t * 3);
        seed_comment(&backend, video, Uuid::new_v4(), "ok", 101 + t * 3);
        seed_view(&backend, video, Some(Uuid::new_v4()), 102 + t * 3);
    }

    let dashboard = Dashboard::new(&client);
    let data = dashboard.load(user_id).await.unwrap();

    assert_eq!(data.recent_activity.len(), ACTIVITY_FEED_LIMIT);
    assert!(data
        .recent_activity
        .windows(2)
        .all(|w| w[0].created_at > w[1].created_at));
    assert_eq!(data.recent_activity[0].created_at, at(117));
}

#[tokio::test]
async fn test_recent_videos_capped_with_per_video_view_counts() {
    let (backend, client, user_id) = signed_in_client();
    let videos: Vec<Uuid> = (0..5)
        .map(|i| seed_video(&backend, user_id, &format!("Clip {}", i), i * DAY, false))
        .collect();
    seed_view(&backend, videos[4], None, 5 * DAY);

    let dashboard = Dashboard::new(&client);
    let data = dashboard.load(user_id).await.unwrap();

    assert_eq!(data.stats.videos_count, 5);
    assert_eq!(data.recent_videos.len(), 3);
    assert_eq!(data.recent_videos[0].video.id, videos[4]);
    assert_eq!(data.recent_videos[0].views, 1);
    assert_eq!(data.recent_videos[1].views, 0);
}

#[tokio::test]
async fn test_failure_keeps_previous_data_and_notifies() {
    let (backend, client, user_id) = signed_in_client();
    let video = seed_video(&backend, user_id, "Serve", 0, false);
    seed_like(&backend, video, Uuid::new_v4(), 1);

    let mut notices = client.notifier.subscribe();
    let dashboard = Dashboard::new(&client);
    dashboard.refresh().await;
    let before = dashboard.state();
    assert_eq!(before.data.stats.likes_count, 1);

    backend.fail_table(tables::LIKES);
    seed_like(&backend, video, Uuid::new_v4(), 2);
    dashboard.refresh().await;

    let after = dashboard.state();
    assert!(!after.loading);
    assert_eq!(after.data, before.data);

    let notices = drain_notices(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].description, "Failed to load dashboard data");
    assert_eq!(notices[0].variant, Variant::Destructive);
}

#[tokio::test]
async fn test_signed_out_dashboard_is_empty() {
    let (backend, client) = anonymous_client();
    let dashboard = Dashboard::new(&client);

    dashboard.refresh().await;

    assert!(!dashboard.state().loading);
    assert!(backend.queries().is_empty());
    assert!(Arc::new(dashboard).mount().await.is_err());
}

#[tokio::test]
async fn test_live_dashboard_refetches_on_change() {
    let (backend, client, user_id) = signed_in_client();
    let video = seed_video(&backend, user_id, "Serve", 0, false);

    let dashboard = Arc::new(Dashboard::new(&client));
    let handle = dashboard.mount().await.unwrap();
    assert_eq!(dashboard.state().data.stats.likes_count, 0);
    assert_eq!(backend.active_subscriptions(), 4);

    backend
        .insert(
            tables::LIKES,
            json!({ "video_id": video, "user_id": Uuid::new_v4() }),
        )
        .await
        .unwrap();
    settle().await;

    let state = dashboard.state();
    assert_eq!(state.data.stats.likes_count, 1);
    assert_eq!(state.data.recent_activity.len(), 1);
    assert!(handle.is_active());
}

#[tokio::test]
async fn test_over_broad_subscription_refetches_for_foreign_likes() {
    let (backend, client, user_id) = signed_in_client();
    seed_video(&backend, user_id, "Serve", 0, false);
    let foreign = seed_video(&backend, Uuid::new_v4(), "Other", 0, false);

    let dashboard = Arc::new(Dashboard::new(&client));
    let _handle = dashboard.mount().await.unwrap();
    backend.clear_log();

    backend
        .insert(
            tables::LIKES,
            json!({ "video_id": foreign, "user_id": Uuid::new_v4() }),
        )
        .await
        .unwrap();
    settle().await;

    assert!(backend.query_count(QueryOp::Select, tables::VIDEOS) >= 1);
    assert_eq!(dashboard.state().data.stats.likes_count, 0);
}

#[tokio::test]
async fn test_unmount_releases_subscriptions() {
    let (backend, client, user_id) = signed_in_client();
    seed_video(&backend, user_id, "Serve", 0, false);

    let dashboard = Arc::new(Dashboard::new(&client));
    let handle = dashboard.mount().await.unwrap();
    assert_eq!(backend.active_subscriptions(), 4);

    drop(handle);
    settle().await;

    assert_eq!(backend.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_sign_out_releases_subscriptions() {
    let (backend, client, user_id) = signed_in_client();
    seed_video(&backend, user_id, "Serve", 0, false);

    let dashboard = Arc::new(Dashboard::new(&client));
    let handle = dashboard.mount().await.unwrap();

    client.sign_out().await.unwrap();
    settle().await;

    assert!(backend.is_signed_out());
    assert!(client.session.user_id().is_none());
    assert_eq!(backend.active_subscriptions(), 0);
    assert!(!handle.is_active());
}
