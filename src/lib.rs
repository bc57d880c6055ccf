// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Courtside: client data layer for a peer-to-peer athletic coaching app.
//!
//! Athletes upload practice videos, coaches comment, and both track likes,
//! views and comments on a dashboard. Persistence, auth, file storage and
//! change notification live in a hosted backend; this crate fetches and
//! aggregates that data and keeps watchable view state fresh from the
//! backend's change feed.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use auth::Session;
use config::Config;
use db::{Backend, Db};
use services::Notifier;

/// Shared client state handed to every service.
pub struct Client<B> {
    pub config: Config,
    pub db: Db<B>,
    pub session: Session,
    pub notifier: Notifier,
}

impl<B> Clone for Client<B> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            db: self.db.clone(),
            session: self.session.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<B: Backend> Client<B> {
    pub fn new(config: Config, backend: Arc<B>, session: Session) -> Self {
        Self {
            config,
            db: Db::new(backend),
            session,
            notifier: Notifier::new(),
        }
    }

    /// End the session: backend logout, then clear the local identity.
    pub async fn sign_out(&self) -> error::Result<()> {
        self.session.sign_out(&self.db).await
    }
}
