// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Request dispatch
//!
//! A [`Dispatcher`] turns one [`LogEntry`] into exactly one [`ReplayOutcome`].
//! It never returns an error: failures to build or send a request are
//! recorded in the outcome with [`FAILURE_STATUS`](crate::types::FAILURE_STATUS).
//!
//! The scheduler spawns one task per entry and does not limit how many run at
//! once. [`BoundedDispatcher`] can wrap any dispatcher to cap the number of
//! requests actually in progress.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, ClientBuilder, Method, Request};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::ReplayError;
use crate::types::{LogEntry, ReplayOutcome};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const USER_AGENT_VALUE: &str = concat!("log-replay/", env!("CARGO_PKG_VERSION"));

/// Executes one replayed request.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, entry: LogEntry) -> ReplayOutcome;
}

/// Sends entries to `prefix + path` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    prefix: String,
}

impl HttpDispatcher {
    /// Build a dispatcher with a per-request timeout; `Duration::ZERO` waits
    /// forever.
    pub fn new(prefix: impl Into<String>, timeout: Duration) -> Result<Self, ReplayError> {
        let mut builder = ClientBuilder::new();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            prefix: prefix.into(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn build_request(&self, method: &str, url: &str, payload: &str) -> Result<Request> {
        let method = Method::from_bytes(method.as_bytes())
            .with_context(|| format!("invalid HTTP method {:?}", method))?;
        let is_post = method == Method::POST;

        let mut builder = self
            .client
            .request(method, url)
            .header(USER_AGENT, USER_AGENT_VALUE);

        if is_post {
            builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
        }
        if !payload.is_empty() {
            builder = builder.body(payload.to_owned());
        }

        builder
            .build()
            .with_context(|| format!("failed to build request to {}", url))
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, entry: LogEntry) -> ReplayOutcome {
        let url = format!("{}{}", self.prefix, entry.path);
        debug!("Querying {} {} {}", entry.method, url, entry.payload);

        let start_unix = Utc::now().timestamp();
        let started = Instant::now();

        let request = match self.build_request(&entry.method, &url, &entry.payload) {
            Ok(request) => request,
            Err(e) => {
                debug!("ERROR {:#} while creating new request to {}", e, url);
                return ReplayOutcome::failure(start_unix, Duration::ZERO, entry.path, entry.payload, format!("{:#}", e));
            }
        };

        match self.client.execute(request).await {
            Ok(response) => ReplayOutcome::success(
                response.status().as_u16(),
                start_unix,
                started.elapsed(),
                entry.path,
                entry.payload,
            ),
            Err(e) => {
                let latency = started.elapsed();
                let e = anyhow::Error::new(e);
                debug!("ERROR {:#} while querying {}", e, url);
                ReplayOutcome::failure(start_unix, latency, entry.path, entry.payload, format!("{:#}", e))
            }
        }
    }
}

/// Caps the number of requests the wrapped dispatcher runs at once.
///
/// Tasks beyond the limit wait for a permit before sending; their latency is
/// measured by the inner dispatcher and excludes the wait.
pub struct BoundedDispatcher<D> {
    inner: D,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl<D: Dispatcher> BoundedDispatcher<D> {
    pub fn new(inner: D, limit: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[async_trait]
impl<D: Dispatcher> Dispatcher for BoundedDispatcher<D> {
    async fn dispatch(&self, entry: LogEntry) -> ReplayOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return ReplayOutcome::failure(Utc::now().timestamp(), Duration::ZERO, entry.path, entry.payload, e);
            }
        };
        self.inner.dispatch(entry).await
    }
}
