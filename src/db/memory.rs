// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory backend for offline use and tests.
//!
//! Mirrors the hosted backend closely enough for the services: rows are JSON
//! objects, `id`/`created_at`/`updated_at` are filled on insert, unique keys
//! are enforced, and every write is published on the change feed. It also
//! records a query log and can be told to reject queries on a table.

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::db::changes::SUBSCRIPTION_BUFFER;
use crate::db::query::render_value;
use crate::db::{tables, Backend, ChangeEvent, ChangeKind, ChangeTopic, Query, Subscription};
use crate::error::{AppError, Result};
use crate::time_utils::format_utc_rfc3339_micros;

const CHANGE_FEED_CAPACITY: usize = 1024;

/// Kind of operation recorded in the query log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Select,
    Count,
    Insert,
    Update,
    Delete,
    Upsert,
}

/// One entry in the query log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub op: QueryOp,
    pub table: String,
}

/// In-memory backend.
pub struct MemoryBackend {
    tables: DashMap<String, Vec<Value>>,
    unique_keys: DashMap<String, Vec<&'static str>>,
    blobs: DashMap<String, Vec<u8>>,
    changes: broadcast::Sender<ChangeEvent>,
    log: Mutex<Vec<QueryRecord>>,
    failing: DashSet<String>,
    latency: Mutex<Duration>,
    signed_out: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend with the application's unique keys.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let unique_keys = DashMap::new();
        unique_keys.insert(tables::LIKES.to_string(), vec!["video_id", "user_id"]);
        unique_keys.insert(tables::PROFILES.to_string(), vec!["user_id"]);

        Self {
            tables: DashMap::new(),
            unique_keys,
            blobs: DashMap::new(),
            changes,
            log: Mutex::new(Vec::new()),
            failing: DashSet::new(),
            latency: Mutex::new(Duration::ZERO),
            signed_out: AtomicBool::new(false),
        }
    }

    // ─── Test Controls ───────────────────────────────────────────

    /// Insert a row directly, bypassing the log and the change feed.
    pub fn seed(&self, table: &str, row: Value) -> Value {
        let row = fill_defaults(row);
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    /// All rows currently in a table.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    /// Reject every query on `table` until [`Self::restore_table`].
    pub fn fail_table(&self, table: &str) {
        self.failing.insert(table.to_string());
    }

    pub fn restore_table(&self, table: &str) {
        self.failing.remove(table);
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Snapshot of the query log.
    pub fn queries(&self) -> Vec<QueryRecord> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of logged operations of `op` on `table`.
    pub fn query_count(&self, op: QueryOp, table: &str) -> usize {
        self.queries()
            .iter()
            .filter(|q| q.op == op && q.table == table)
            .count()
    }

    pub fn clear_log(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }

    /// Number of open change-feed subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Stored blob, if any.
    pub fn blob(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.blobs
            .get(&blob_key(bucket, path))
            .map(|b| b.value().clone())
    }

    pub fn is_signed_out(&self) -> bool {
        self.signed_out.load(Ordering::SeqCst)
    }

    // ─── Internals ───────────────────────────────────────────────

    async fn begin(&self, op: QueryOp, table: &str) -> Result<()> {
        let latency = self.latency.lock().map(|l| *l).unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Ok(mut log) = self.log.lock() {
            log.push(QueryRecord {
                op,
                table: table.to_string(),
            });
        }

        if self.failing.contains(table) {
            return Err(AppError::Backend(format!(
                "Injected failure for table {}",
                table
            )));
        }
        Ok(())
    }

    fn publish(&self, table: &str, kind: ChangeKind, record: Option<Value>, old: Option<Value>) {
        // No receivers is fine
        let _ = self.changes.send(ChangeEvent {
            table: table.to_string(),
            kind,
            record,
            old_record: old,
        });
    }

    fn violates_unique(&self, table: &str, rows: &[Value], candidate: &Value) -> bool {
        let Some(columns) = self.unique_keys.get(table) else {
            return false;
        };
        let key = |row: &Value| -> Vec<Option<String>> {
            columns
                .iter()
                .map(|c| row.get(*c).and_then(render_value))
                .collect()
        };
        let candidate_key = key(candidate);
        rows.iter().any(|row| key(row) == candidate_key)
    }
}

impl Backend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.begin(QueryOp::Select, &query.table).await?;
        Ok(self
            .tables
            .get(&query.table)
            .map(|rows| query.apply(rows.iter()))
            .unwrap_or_default())
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        self.begin(QueryOp::Count, &query.table).await?;
        Ok(self
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        self.begin(QueryOp::Insert, table).await?;
        let row = fill_defaults(row);

        {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            if self.violates_unique(table, &rows, &row) {
                return Err(AppError::Backend(
                    "duplicate key value violates unique constraint".to_string(),
                ));
            }
            rows.push(row.clone());
        }

        self.publish(table, ChangeKind::Insert, Some(row.clone()), None);
        Ok(row)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<()> {
        self.begin(QueryOp::Update, &query.table).await?;
        let Value::Object(patch) = patch else {
            return Err(AppError::BadRequest("Update patch must be an object".to_string()));
        };

        let mut changed = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(&query.table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                let old = row.clone();
                if let Value::Object(map) = &mut *row {
                    for (k, v) in &patch {
                        map.insert(k.clone(), v.clone());
                    }
                    map.insert(
                        "updated_at".to_string(),
                        Value::String(format_utc_rfc3339_micros(Utc::now())),
                    );
                }
                changed.push((row.clone(), old));
            }
        }

        for (new, old) in changed {
            self.publish(&query.table, ChangeKind::Update, Some(new), Some(old));
        }
        Ok(())
    }

    async fn delete(&self, query: &Query) -> Result<()> {
        self.begin(QueryOp::Delete, &query.table).await?;

        let mut removed = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(&query.table) {
            rows.retain(|r| {
                if query.matches(r) {
                    removed.push(r.clone());
                    false
                } else {
                    true
                }
            });
        }

        for old in removed {
            self.publish(&query.table, ChangeKind::Delete, None, Some(old));
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, conflict: &str, row: Value) -> Result<Value> {
        self.begin(QueryOp::Upsert, table).await?;
        let Some(key) = row.get(conflict).and_then(render_value) else {
            return Err(AppError::BadRequest(format!(
                "Upsert row is missing conflict column {}",
                conflict
            )));
        };

        let (stored, old) = {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            let position = rows
                .iter()
                .position(|r| r.get(conflict).and_then(render_value).as_deref() == Some(key.as_str()));

            match position {
                Some(i) => {
                    let old = rows[i].clone();
                    if let (Value::Object(map), Value::Object(patch)) = (&mut rows[i], &row) {
                        for (k, v) in patch {
                            map.insert(k.clone(), v.clone());
                        }
                    }
                    (rows[i].clone(), Some(old))
                }
                None => {
                    let row = fill_defaults(row);
                    rows.push(row.clone());
                    (row, None)
                }
            }
        };

        let kind = if old.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        self.publish(table, kind, Some(stored.clone()), old);
        Ok(stored)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        if self.failing.contains(bucket) {
            return Err(AppError::Storage(format!(
                "Injected failure for bucket {}",
                bucket
            )));
        }

        let key = blob_key(bucket, path);
        if !upsert && self.blobs.contains_key(&key) {
            return Err(AppError::Storage("The resource already exists".to_string()));
        }
        self.blobs.insert(key, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}", blob_key(bucket, path))
    }

    async fn sign_out(&self) -> Result<()> {
        self.signed_out.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription> {
        let mut feed = self.changes.subscribe();
        let (tx, events) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let scope = topic.clone();

        let feeder = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(event) => {
                        if scope.matches(&event) && tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        tracing::debug!(topic = %topic.channel_name(), "Subscribed to in-memory change feed");
        Ok(Subscription::new(topic, events, feeder))
    }
}

fn blob_key(bucket: &str, path: &str) -> String {
    format!("{}/{}", bucket, path.trim_start_matches('/'))
}

/// Fill `id`, `created_at` and `updated_at` like the hosted backend does.
fn fill_defaults(row: Value) -> Value {
    let Value::Object(mut map) = row else {
        return row;
    };
    let now = format_utc_rfc3339_micros(Utc::now());
    set_if_missing(&mut map, "id", Value::String(Uuid::new_v4().to_string()));
    set_if_missing(&mut map, "created_at", Value::String(now.clone()));
    set_if_missing(&mut map, "updated_at", Value::String(now));
    Value::Object(map)
}

fn set_if_missing(map: &mut Map<String, Value>, key: &str, value: Value) {
    if map.get(key).map_or(true, Value::is_null) {
        map.insert(key.to_string(), value);
    }
}
