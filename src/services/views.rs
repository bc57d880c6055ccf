// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View counter for a single video.
//!
//! Every playback start inserts a new row; repeated plays by the same viewer
//! are counted again. Failures are logged only.

use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::Session;
use crate::db::{Backend, Db};
use crate::error::Result;
use crate::models::NewView;
use crate::services::store::{Loadable, Store};
use crate::Client;

pub struct ViewCounter<B> {
    video_id: Uuid,
    db: Db<B>,
    session: Session,
    user_agent: String,
    store: Store<u64>,
}

impl<B: Backend> ViewCounter<B> {
    pub fn new(client: &Client<B>, video_id: Uuid) -> Self {
        Self {
            video_id,
            db: client.db.clone(),
            session: client.session.clone(),
            user_agent: client.config.user_agent.clone(),
            store: Store::new(0),
        }
    }

    pub fn views(&self) -> u64 {
        self.store.data()
    }

    pub fn watch(&self) -> watch::Receiver<Loadable<u64>> {
        self.store.watch()
    }

    pub async fn refresh(&self) {
        let ticket = self.store.begin();
        match self.db.count_views_for_video(self.video_id).await {
            Ok(count) => {
                self.store.commit(ticket, count);
            }
            Err(e) => {
                tracing::error!(error = %e, video_id = %self.video_id, "Error fetching video views");
                self.store.finish(ticket);
            }
        }
    }

    /// Record a playback start (anonymous when signed out), then recount.
    pub async fn track_view(&self) {
        if let Err(e) = self.record().await {
            tracing::error!(error = %e, video_id = %self.video_id, "Error tracking video view");
            return;
        }
        self.refresh().await;
    }

    async fn record(&self) -> Result<()> {
        let view = NewView {
            video_id: self.video_id,
            user_id: self.session.user_id(),
            ip_address: None,
            user_agent: Some(self.user_agent.clone()),
        };
        let stored = self.db.insert_view(&view).await?;
        tracing::debug!(video_id = %self.video_id, view_id = %stored.id, "Tracked view");
        Ok(())
    }
}
