// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Core value types for replayed log entries and their recorded outcomes.

use chrono::{DateTime, FixedOffset};
use std::fmt::Write as _;
use std::time::Duration;

/// Status recorded for any request that never produced an HTTP response.
pub const FAILURE_STATUS: u16 = 500;

/// Field separator of an outcome line.
pub const OUTCOME_DELIMITER: char = '\t';

/// Single normalized entry parsed from a source log line.
///
/// Produced by a format parser, consumed once by the scheduler and then moved
/// into exactly one dispatch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Time the original request was logged
    pub timestamp: DateTime<FixedOffset>,

    /// HTTP verb, as written in the log
    pub method: String,

    /// URL path plus query string, appended verbatim to the target prefix
    pub path: String,

    /// Request body; empty for anything but search-query entries
    pub payload: String,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        method: impl Into<String>,
        path: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            method: method.into(),
            path: path.into(),
            payload: payload.into(),
        }
    }

    /// GET entries are always paced against the previous entry.
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }
}

/// Result of dispatching one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// HTTP status, or [`FAILURE_STATUS`] when no response was received
    pub status: u16,

    /// Unix time (seconds) at which the request was started
    pub start_unix: i64,

    /// Round-trip latency; zero when the request could not be built
    pub latency_ns: u128,

    pub path: String,
    pub payload: String,

    /// Present only on failure
    pub error: Option<String>,
}

impl ReplayOutcome {
    pub fn success(status: u16, start_unix: i64, latency: Duration, path: String, payload: String) -> Self {
        Self {
            status,
            start_unix,
            latency_ns: latency.as_nanos(),
            path,
            payload,
            error: None,
        }
    }

    pub fn failure(
        start_unix: i64,
        latency: Duration,
        path: String,
        payload: String,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            status: FAILURE_STATUS,
            start_unix,
            latency_ns: latency.as_nanos(),
            path,
            payload,
            // keep the record on one line
            error: Some(error.to_string().replace(['\t', '\n', '\r'], " ")),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Render as one newline-terminated output record:
    /// `status start latency path payload [error]`.
    pub fn to_line(&self) -> String {
        let d = OUTCOME_DELIMITER;
        let mut line = format!(
            "{}{d}{}{d}{}{d}{}{d}{}",
            self.status, self.start_unix, self.latency_ns, self.path, self.payload
        );
        if let Some(ref err) = self.error {
            let _ = write!(line, "{d}{}", err);
        }
        line.push('\n');
        line
    }
}
