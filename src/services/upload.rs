// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video upload: store the file, then create its metadata row.

use chrono::Utc;
use tokio::sync::watch;
use validator::Validate;

use crate::auth::Session;
use crate::db::{Backend, Db};
use crate::error::Result;
use crate::models::{NewVideo, NewVideoDetails, Video};
use crate::services::profile::file_extension;
use crate::services::Notifier;
use crate::Client;

pub struct VideoUploader<B> {
    db: Db<B>,
    session: Session,
    notifier: Notifier,
    uploading: watch::Sender<bool>,
}

impl<B: Backend> VideoUploader<B> {
    pub fn new(client: &Client<B>) -> Self {
        let (uploading, _) = watch::channel(false);
        Self {
            db: client.db.clone(),
            session: client.session.clone(),
            notifier: client.notifier.clone(),
            uploading,
        }
    }

    pub fn is_uploading(&self) -> bool {
        *self.uploading.borrow()
    }

    pub fn watch_uploading(&self) -> watch::Receiver<bool> {
        self.uploading.subscribe()
    }

    /// Upload a video for the signed-in user.
    ///
    /// Returns `None` (after a notice) when signed out or on failure.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        details: NewVideoDetails,
    ) -> Option<Video> {
        let Some(user_id) = self.session.user_id() else {
            self.notifier.error("You must be logged in to upload videos");
            return None;
        };

        self.uploading.send_replace(true);
        let path = format!(
            "{}/{}.{}",
            user_id,
            Utc::now().timestamp_millis(),
            file_extension(file_name)
        );
        let size = bytes.len();
        let result = self.store(&path, bytes, content_type, details, user_id).await;
        self.uploading.send_replace(false);

        match result {
            Ok(video) => {
                tracing::info!(user_id = %user_id, video_id = %video.id, path = %path, size, "Uploaded video");
                self.notifier.success("Video uploaded successfully");
                Some(video)
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, path = %path, "Error uploading video");
                self.notifier.error(e.to_string());
                None
            }
        }
    }

    async fn store(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        details: NewVideoDetails,
        user_id: uuid::Uuid,
    ) -> Result<Video> {
        details.validate()?;
        let video_url = self.db.upload_video_file(path, bytes, content_type).await?;
        self.db
            .insert_video(&NewVideo::new(user_id, video_url, details))
            .await
    }
}
