// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Replay configuration, built once and passed to every component.

use std::time::Duration;

use crate::error::ReplayError;
use crate::format::{LogFormat, DEFAULT_ACCESS_FORMAT};
use crate::input::InputSource;
use crate::sink::OutputTarget;

/// Default per-request timeout (60 s).
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default target prefix.
pub const DEFAULT_PREFIX: &str = "http://localhost";

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Input log type
    pub format: LogFormat,

    /// Where log lines are read from
    pub input: InputSource,

    /// Scheme and host prepended to every replayed path
    pub prefix: String,

    /// Divisor applied to pacing delays (1 = original speed, 2 = twice as fast)
    pub ratio: u32,

    /// Dispatch entries back to back, ignoring timestamps
    pub skip_sleep: bool,

    /// Per-request timeout; zero means wait indefinitely
    pub timeout: Duration,

    /// Where outcome lines are written
    pub output: OutputTarget,

    /// Emit per-request diagnostics
    pub debug: bool,

    /// Optional cap on concurrent requests; `None` dispatches without limit
    pub max_in_flight: Option<usize>,

    /// Skip lines that fail to parse (timestamp errors still abort)
    pub skip_malformed: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Access {
                format: DEFAULT_ACCESS_FORMAT.to_string(),
            },
            input: InputSource::Stdin,
            prefix: DEFAULT_PREFIX.to_string(),
            ratio: 1,
            skip_sleep: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            output: OutputTarget::Stdout,
            debug: false,
            max_in_flight: None,
            skip_malformed: false,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.ratio == 0 {
            return Err(ReplayError::InvalidConfig("ratio must be at least 1".to_string()));
        }
        if self.prefix.is_empty() {
            return Err(ReplayError::InvalidConfig("prefix must not be empty".to_string()));
        }
        if self.max_in_flight == Some(0) {
            return Err(ReplayError::InvalidConfig("max-in-flight must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Whether `entry` waits out the gap to the previous entry.
    pub fn paces(&self, entry: &crate::types::LogEntry) -> bool {
        !self.skip_sleep && self.format.paces(entry)
    }
}

/// Parse a timeout given either as bare milliseconds (`60000`) or as a
/// humantime duration (`90s`, `1m 30s`).
pub fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| format!("invalid timeout {:?}: {}", s, e))
}
