// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keeps a service's view state current from the change feed.
//!
//! [`mount`] opens one subscription per topic, runs an initial refresh and
//! then re-fetches on every matching change. Events that arrive while a
//! refresh is running collapse into a single follow-up refresh. Dropping the
//! returned [`LiveHandle`], or a change of signed-in identity, releases every
//! subscription and retires in-flight fetches.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::auth::AuthUser;
use crate::db::changes::SUBSCRIPTION_BUFFER;
use crate::db::{Backend, ChangeEvent, ChangeTopic, Db};
use crate::error::Result;

/// A service whose state can be re-fetched wholesale.
pub trait Refresh: Send + Sync + 'static {
    /// Re-fetch everything. Failures are handled (logged, notified) inside.
    fn refresh(&self) -> impl Future<Output = ()> + Send;

    /// Retire in-flight fetches so they cannot commit.
    fn invalidate(&self) {}
}

/// Why the live loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    IdentityChanged,
    FeedClosed,
}

/// Mounted service. Dropping it unsubscribes.
pub struct LiveHandle {
    topics: Vec<ChangeTopic>,
    task: JoinHandle<()>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl LiveHandle {
    pub fn topics(&self) -> &[ChangeTopic] {
        &self.topics
    }

    /// Whether the change loop is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(release) = self.release.take() {
            release();
        }
        tracing::debug!(topics = self.topics.len(), "Unmounted live view");
    }
}

/// Resolves when the signed-in identity changes; never, once the session
/// itself is gone.
async fn identity_changed(identity: &mut watch::Receiver<Option<AuthUser>>) {
    if identity.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Subscribe `target` to `topics` and keep it refreshed.
///
/// Fails if any subscription cannot be opened; subscriptions opened before
/// the failure are released.
pub async fn mount<B, R>(
    db: &Db<B>,
    topics: Vec<ChangeTopic>,
    target: Arc<R>,
    mut identity: watch::Receiver<Option<AuthUser>>,
) -> Result<LiveHandle>
where
    B: Backend,
    R: Refresh,
{
    let mut subscriptions = Vec::with_capacity(topics.len());
    for topic in &topics {
        subscriptions.push(db.subscribe(topic.clone()).await?);
    }

    // Only changes after this point end the mount
    identity.borrow_and_update();

    target.refresh().await;

    let (tx, mut events) = mpsc::channel::<ChangeEvent>(SUBSCRIPTION_BUFFER);
    let mut forwarders = JoinSet::new();
    for mut subscription in subscriptions {
        let tx = tx.clone();
        forwarders.spawn(async move {
            while let Some(event) = subscription.next().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let worker = target.clone();
    let task = tokio::spawn(async move {
        // Dropped with this task, which drops every subscription
        let _forwarders = forwarders;

        let stop = loop {
            let event = tokio::select! {
                _ = identity_changed(&mut identity) => break Stop::IdentityChanged,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                break Stop::FeedClosed;
            };

            let mut coalesced = 0usize;
            while events.try_recv().is_ok() {
                coalesced += 1;
            }
            tracing::debug!(
                table = %event.table,
                kind = ?event.kind,
                coalesced,
                "Change received, refreshing"
            );

            tokio::select! {
                _ = worker.refresh() => {}
                _ = identity_changed(&mut identity) => break Stop::IdentityChanged,
            }
        };

        worker.invalidate();
        match stop {
            Stop::IdentityChanged => {
                tracing::info!("Signed-in identity changed, releasing subscriptions")
            }
            Stop::FeedClosed => tracing::warn!("Change feed closed, live updates stopped"),
        }
    });

    tracing::debug!(topics = topics.len(), "Mounted live view");
    Ok(LiveHandle {
        topics,
        task,
        release: Some(Box::new(move || target.invalidate())),
    })
}
