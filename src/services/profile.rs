// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-in user's profile.

use std::path::Path;
use tokio::sync::watch;
use validator::Validate;

use crate::auth::Session;
use crate::db::{Backend, Db};
use crate::error::{AppError, Result};
use crate::models::{Profile, ProfileUpdate};
use crate::services::store::{Loadable, Store};
use crate::services::Notifier;
use crate::Client;

pub struct ProfileService<B> {
    db: Db<B>,
    session: Session,
    notifier: Notifier,
    store: Store<Option<Profile>>,
}

/// Extension of an uploaded file name (`bin` when it has none).
pub(crate) fn file_extension(file_name: &str) -> &str {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
}

impl<B: Backend> ProfileService<B> {
    pub fn new(client: &Client<B>) -> Self {
        Self {
            db: client.db.clone(),
            session: client.session.clone(),
            notifier: client.notifier.clone(),
            store: Store::new(None),
        }
    }

    pub fn profile(&self) -> Option<Profile> {
        self.store.data()
    }

    pub fn watch(&self) -> watch::Receiver<Loadable<Option<Profile>>> {
        self.store.watch()
    }

    /// Load the signed-in user's profile; cleared when signed out.
    pub async fn refresh(&self) {
        let Some(user_id) = self.session.user_id() else {
            self.store.reset(None);
            return;
        };

        let ticket = self.store.begin();
        let result = match self.db.get_profile(user_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(AppError::NotFound(format!("Profile for {}", user_id))),
            Err(e) => Err(e),
        };

        match result {
            Ok(profile) => {
                self.store.commit(ticket, Some(profile));
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Error fetching profile");
                if self.store.finish(ticket) {
                    self.notifier.error("Failed to load profile");
                }
            }
        }
    }

    /// Create the profile row if the user has none yet (first sign-in).
    pub async fn ensure(&self, defaults: ProfileUpdate) -> Result<Profile> {
        let user_id = self.session.require_user()?;
        defaults.validate()?;

        if let Some(existing) = self.db.get_profile(user_id).await? {
            self.store.reset(Some(existing.clone()));
            return Ok(existing);
        }

        let created = self.db.upsert_profile(user_id, &defaults).await?;
        tracing::info!(user_id = %user_id, role = ?created.role, "Created profile");
        self.store.reset(Some(created.clone()));
        Ok(created)
    }

    /// Patch the profile and merge the change locally.
    pub async fn update(&self, update: ProfileUpdate) -> Result<()> {
        let user_id = self.session.require_user()?;
        let result: Result<()> = async {
            update.validate()?;
            self.db.update_profile(user_id, &update).await
        }
        .await;

        match result {
            Ok(()) => {
                self.store.modify(|profile| {
                    if let Some(p) = profile {
                        p.apply(&update);
                    }
                });
                self.notifier.success("Profile updated successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Error updating profile");
                self.notifier.error("Failed to update profile");
                Err(e)
            }
        }
    }

    /// Replace the avatar image and point the profile at it.
    ///
    /// Returns the new public URL.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let user_id = self.session.require_user()?;
        let path = format!("{}/avatar.{}", user_id, file_extension(file_name));

        let url = match self.db.upload_avatar(&path, bytes, content_type).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Error uploading avatar");
                self.notifier.error("Failed to upload avatar");
                return Err(e);
            }
        };

        self.update(ProfileUpdate {
            avatar_url: Some(url.clone()),
            ..ProfileUpdate::default()
        })
        .await?;
        Ok(url)
    }
}
