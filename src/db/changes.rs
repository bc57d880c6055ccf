// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Change-feed topics, events and subscriptions.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::Filter;

/// Buffered events per subscription before the feed applies backpressure.
pub const SUBSCRIPTION_BUFFER: usize = 64;

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Parse the realtime wire name (`INSERT`, `UPDATE`, `DELETE`).
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// A row change delivered by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// New row (insert/update)
    pub record: Option<Value>,
    /// Previous row (update/delete)
    pub old_record: Option<Value>,
}

/// A (table, filter) pair to listen on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTopic {
    pub table: String,
    pub filter: Option<Filter>,
}

impl ChangeTopic {
    /// Every change on a table.
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filter: None,
        }
    }

    /// Changes on a table whose row matches `filter`.
    pub fn filtered(table: &str, filter: Filter) -> Self {
        Self {
            table: table.to_string(),
            filter: Some(filter),
        }
    }

    /// Whether an event falls in this topic's scope.
    ///
    /// Deletes are matched against the old row.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => [&event.record, &event.old_record]
                .into_iter()
                .flatten()
                .any(|row| filter.matches(row)),
        }
    }

    /// Channel name used on the realtime socket.
    pub fn channel_name(&self) -> String {
        match &self.filter {
            None => self.table.clone(),
            Some(filter) => format!("{}:{}", self.table, filter.realtime_expr()),
        }
    }
}

/// Live subscription to one topic.
///
/// Dropping the subscription stops the task feeding it, which releases the
/// underlying channel.
pub struct Subscription {
    topic: ChangeTopic,
    events: mpsc::Receiver<ChangeEvent>,
    feeder: JoinHandle<()>,
}

impl Subscription {
    pub fn new(
        topic: ChangeTopic,
        events: mpsc::Receiver<ChangeEvent>,
        feeder: JoinHandle<()>,
    ) -> Self {
        Self {
            topic,
            events,
            feeder,
        }
    }

    pub fn topic(&self) -> &ChangeTopic {
        &self.topic
    }

    /// Next matching event, or `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feeder.abort();
        tracing::debug!(topic = %self.topic.channel_name(), "Subscription released");
    }
}
