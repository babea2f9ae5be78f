// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! log-replay: replay captured HTTP access logs against a target server
//!
//! Reads nginx, haproxy or solr logs, reproduces the original gaps between
//! requests (optionally sped up by an integer ratio) and records the status
//! and latency of every replayed request as one tab-separated line.
//!
//! # Features
//!
//! - **Multi-format support**: nginx `log_format` strings, haproxy HTTP logs,
//!   solr query logs (replayed as form-encoded POSTs)
//! - **Compressed input**: `.gz` and `.zst` files are decoded transparently
//! - **Timing-faithful replay**: gaps between GET entries are slept out,
//!   divided by the configured ratio, or skipped entirely
//! - **Pluggable execution**: the [`Dispatcher`] trait decides how one entry
//!   is sent; [`BoundedDispatcher`] caps concurrency when needed
//! - **Lossless shutdown**: the output is only closed after every in-flight
//!   request has reported
//!
//! # Usage
//!
//! ```no_run
//! use log_replay::{replay, InputSource, LogFormat, ReplayConfig};
//! use std::path::PathBuf;
//!
//! # async fn run() -> Result<(), log_replay::ReplayError> {
//! let config = ReplayConfig {
//!     format: LogFormat::Balancer,
//!     input: InputSource::File(PathBuf::from("haproxy.log.gz")),
//!     prefix: "http://staging.internal".to_string(),
//!     ratio: 10,
//!     ..Default::default()
//! };
//!
//! let summary = replay(config).await?;
//! println!("{} requests, {} failed", summary.recorded, summary.failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom dispatcher
//!
//! ```no_run
//! use async_trait::async_trait;
//! use log_replay::{replay_with, Dispatcher, LineEntryReader, LogEntry, LogFormat, ReplayConfig, ReplayOutcome};
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Dispatcher for Echo {
//!     async fn dispatch(&self, entry: LogEntry) -> ReplayOutcome {
//!         ReplayOutcome::success(200, 0, Duration::ZERO, entry.path, entry.payload)
//!     }
//! }
//!
//! # async fn run() -> Result<(), log_replay::ReplayError> {
//! let config = ReplayConfig { format: LogFormat::Search, skip_sleep: true, ..Default::default() };
//! let reader = LineEntryReader::for_format(Cursor::new(config.format.sample()), &config.format)?;
//! replay_with(config, reader, Arc::new(Echo), std::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod input;
pub mod reader;
pub mod replayer;
pub mod shutdown;
pub mod sink;
pub mod types;

// Re-export main types and functions for convenience
pub use config::{parse_timeout, ReplayConfig, DEFAULT_PREFIX, DEFAULT_TIMEOUT_MS};
pub use dispatch::{BoundedDispatcher, Dispatcher, HttpDispatcher};
pub use error::{ParseError, ReplayError};
pub use format::{FileType, FormatParser, LogFormat, DEFAULT_ACCESS_FORMAT};
pub use input::InputSource;
pub use reader::{EntryReader, LineEntryReader};
pub use replayer::{dispatcher_for, replay, replay_with, Pacer, ReplaySummary, Scheduler};
pub use shutdown::InFlight;
pub use sink::{OutputTarget, ResultSink, SinkStats};
pub use types::{LogEntry, ReplayOutcome, FAILURE_STATUS};
