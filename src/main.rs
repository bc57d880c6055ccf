// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Courtside dashboard watcher
//!
//! Signs in with the configured access token, mounts the user's dashboard
//! against the hosted backend and logs every state change and notice until
//! interrupted.

use courtside::{
    auth::Session, config::Config, db::RestBackend, services::Dashboard,
    time_utils::format_utc_rfc3339, Client,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(backend = %config.backend_url, "Starting Courtside dashboard watcher");

    let session = Session::anonymous();
    match config.access_token.as_deref() {
        Some(token) => {
            session.sign_in(token)?;
        }
        None => {
            tracing::error!("BACKEND_ACCESS_TOKEN is not set; nothing to watch");
            return Err("a signed-in session is required".into());
        }
    }

    let backend = Arc::new(RestBackend::new(&config, session.clone()));
    let client = Client::new(config, backend, session);

    let mut notices = client.notifier.subscribe();
    let dashboard = Arc::new(Dashboard::new(&client));
    let mut state = dashboard.watch();

    let live = dashboard.mount().await?;
    tracing::info!(topics = live.topics().len(), "Dashboard mounted");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                if snapshot.loading {
                    continue;
                }
                let stats = &snapshot.data.stats;
                tracing::info!(
                    videos = stats.videos_count,
                    likes = stats.likes_count,
                    comments = stats.comments_count,
                    views = stats.views_count,
                    rewards = stats.rewards_count,
                    "Dashboard updated"
                );
                for item in &snapshot.data.recent_activity {
                    tracing::info!(
                        kind = ?item.kind,
                        user = item.user_name.as_deref().unwrap_or_default(),
                        video = item.video_title.as_deref().unwrap_or_default(),
                        at = %format_utc_rfc3339(item.created_at),
                        "{}",
                        item.action
                    );
                }
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    tracing::warn!(
                        title = %notice.title,
                        variant = ?notice.variant,
                        "{}",
                        notice.description
                    );
                }
            }
        }
        if !live.is_active() {
            tracing::warn!("Live updates stopped");
            break;
        }
    }

    drop(live);
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "courtside=debug".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    let filter = match "info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };

    tracing_subscriber::registry().with(filter).with(format).init();
}
