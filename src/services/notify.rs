// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transient user-visible notifications.
//!
//! Services report failures and confirmations here instead of returning
//! errors from their refresh paths. Consumers subscribe and render notices
//! however they like (the binary logs them).

use tokio::sync::broadcast;

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

/// Broadcast channel for notices; clones share the channel.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn notify(&self, notice: Notice) {
        // Nobody listening is fine
        let _ = self.tx.send(notice);
    }

    pub fn success(&self, description: impl Into<String>) {
        self.notify(Notice {
            title: "Success".to_string(),
            description: description.into(),
            variant: Variant::Default,
        });
    }

    pub fn error(&self, description: impl Into<String>) {
        self.notify(Notice {
            title: "Error".to_string(),
            description: description.into(),
            variant: Variant::Destructive,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_notice_is_destructive() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.error("Failed to load videos");

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.title, "Error");
        assert_eq!(notice.variant, Variant::Destructive);
    }

    #[test]
    fn test_notify_without_listeners_is_silent() {
        Notifier::new().success("Video uploaded successfully");
    }
}
