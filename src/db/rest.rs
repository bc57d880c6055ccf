// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! REST client for the hosted backend.
//!
//! Handles:
//! - Row queries and mutations (PostgREST dialect)
//! - Row counts via `HEAD` + `Prefer: count=exact`
//! - Object storage uploads and public URLs
//! - Session logout
//! - Realtime subscriptions (delegated to [`crate::db::realtime`])

use reqwest::{header, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::auth::Session;
use crate::config::Config;
use crate::db::{realtime, Backend, ChangeTopic, Query, Subscription};
use crate::error::{AppError, Result};

/// Backend REST client.
#[derive(Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: Session,
    heartbeat: Duration,
}

/// Error body returned by the row store.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RestBackend {
    /// Create a client for the configured project, authenticating as the
    /// session's user (or anonymously).
    pub fn new(config: &Config, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.backend_url.clone(),
            anon_key: config.anon_key.clone(),
            session,
            heartbeat: Duration::from_secs(config.realtime_heartbeat_secs),
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        )
    }

    /// Request with API key and bearer auth (user token, else anon key).
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());

        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(transport_error)?;
        check_response(response).await
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Invalid response body: {}", e)))
    }
}

/// Requests that could not be built never reached the backend.
fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_builder() {
        AppError::Internal(anyhow::anyhow!("Failed to build request: {}", err))
    } else {
        AppError::Backend(err.to_string())
    }
}

/// Check response status and map failures to `AppError`.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or(body);

    match status.as_u16() {
        401 | 403 => {
            tracing::warn!(status = status.as_u16(), message = %message, "Backend rejected credentials");
            Err(AppError::Unauthorized)
        }
        404 => Err(AppError::NotFound(message)),
        _ => Err(AppError::Backend(format!("HTTP {}: {}", status, message))),
    }
}

/// Parse the total out of a `Content-Range` header (`0-24/3573`, `*/0`).
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// First row of a `return=representation` response.
fn first_row(rows: Vec<Value>) -> Result<Value> {
    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::Backend("Write returned no rows".to_string()))
}

impl Backend for RestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .request(Method::GET, &self.rest_url(&query.table))
            .query(&query.to_params());
        self.send_json(request).await
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let request = self
            .request(Method::HEAD, &self.rest_url(&query.table))
            .header("Prefer", "count=exact")
            .query(&query.to_params());

        let response = self.send(request).await?;
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| AppError::Backend("Count response missing Content-Range".to_string()))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let request = self
            .request(Method::POST, &self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        first_row(self.send_json(request).await?)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<()> {
        let request = self
            .request(Method::PATCH, &self.rest_url(&query.table))
            .query(&query.filter_params())
            .json(&patch);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, query: &Query) -> Result<()> {
        let request = self
            .request(Method::DELETE, &self.rest_url(&query.table))
            .query(&query.filter_params());
        self.send(request).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, conflict: &str, row: Value) -> Result<Value> {
        let request = self
            .request(Method::POST, &self.rest_url(table))
            .query(&[("on_conflict", conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        first_row(self.send_json(request).await?)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        let size = bytes.len();
        let request = self
            .request(Method::POST, &self.storage_url(bucket, path))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);

        self.send(request).await.map_err(|e| match e {
            AppError::Backend(msg) | AppError::NotFound(msg) => AppError::Storage(msg),
            other => other,
        })?;

        tracing::debug!(bucket, path, size, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        )
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session.access_token().is_none() {
            return Ok(());
        }
        let url = format!("{}/auth/v1/logout", self.base_url);
        self.send(self.request(Method::POST, &url)).await?;
        Ok(())
    }

    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription> {
        let url = realtime::websocket_url(&self.base_url, &self.anon_key);
        realtime::subscribe(&url, self.session.access_token(), topic, self.heartbeat).await
    }
}
