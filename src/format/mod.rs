// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Source log formats and their line parsers
//!
//! Three formats are supported, each turning one raw line into a normalized
//! [`LogEntry`]:
//!
//! - **nginx** (`access`): driven by an nginx `log_format` string; the
//!   `$time_local` and `$request` fields are required
//! - **haproxy** (`balancer`): HTTP log lines with a millisecond timestamp in
//!   the last `[...]` pair and the request line in trailing quotes
//! - **solr** (`search`): query logs replayed as POSTs, with the body taken
//!   from the `params={...}` token

pub mod access;
pub mod balancer;
pub mod search;

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ReplayError};
use crate::types::LogEntry;

pub use access::{AccessFormat, AccessParser, AccessRecord};
pub use balancer::BalancerParser;
pub use search::SearchParser;

/// Default nginx `log_format` used when none is configured.
pub const DEFAULT_ACCESS_FORMAT: &str = r#"$remote_addr [$time_local] "$request" $status $request_length $body_bytes_sent $request_time "$t_size" $read_time $gen_time"#;

/// Parses one raw line into a [`LogEntry`].
pub trait FormatParser: Send + Sync {
    fn parse(&self, line: &str) -> Result<LogEntry, ParseError>;
}

/// Input log type, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// nginx access log described by a `log_format` string
    Access { format: String },
    /// haproxy HTTP log
    Balancer,
    /// solr query log
    Search,
}

impl LogFormat {
    /// Select a format from its `--file-type` name. The access format string
    /// is only used for `nginx`.
    pub fn from_file_type(file_type: &str, access_format: &str) -> Result<Self, ReplayError> {
        match file_type.parse::<FileType>()? {
            FileType::Nginx => Ok(LogFormat::Access { format: access_format.to_string() }),
            FileType::Haproxy => Ok(LogFormat::Balancer),
            FileType::Solr => Ok(LogFormat::Search),
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            LogFormat::Access { .. } => FileType::Nginx,
            LogFormat::Balancer => FileType::Haproxy,
            LogFormat::Search => FileType::Solr,
        }
    }

    /// Search-query entries are synthetic POSTs and are all paced; other
    /// formats only pace GET entries.
    pub fn paces(&self, entry: &LogEntry) -> bool {
        matches!(self, LogFormat::Search) || entry.is_get()
    }

    /// Build the parser for this format.
    pub fn parser(&self) -> Result<Box<dyn FormatParser>, ReplayError> {
        let parser: Box<dyn FormatParser> = match self {
            LogFormat::Access { format } => {
                let compiled = AccessFormat::compile(format)
                    .map_err(|e| ReplayError::InvalidConfig(format!("bad nginx log format: {e}")))?;
                Box::new(AccessParser::new(compiled))
            }
            LogFormat::Balancer => Box::new(BalancerParser),
            LogFormat::Search => Box::new(SearchParser),
        };
        Ok(parser)
    }

    /// Built-in single-line sample, used by the `dummy` input.
    ///
    /// The nginx sample only fits [`DEFAULT_ACCESS_FORMAT`].
    pub fn sample(&self) -> &'static str {
        match self {
            LogFormat::Access { .. } => access::SAMPLE,
            LogFormat::Balancer => balancer::SAMPLE,
            LogFormat::Search => search::SAMPLE,
        }
    }
}

/// Names accepted by `--file-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Nginx,
    Haproxy,
    Solr,
}

impl FromStr for FileType {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nginx" => Ok(FileType::Nginx),
            "haproxy" => Ok(FileType::Haproxy),
            "solr" => Ok(FileType::Solr),
            _ => Err(ReplayError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Nginx => write!(f, "nginx"),
            FileType::Haproxy => write!(f, "haproxy"),
            FileType::Solr => write!(f, "solr"),
        }
    }
}

/// Split an HTTP request line (`GET /path HTTP/1.1`) into method and path.
///
/// The line must hold three space-separated parts; anything after the second
/// space is taken as the protocol.
pub(crate) fn split_request(request: &str) -> Result<(&str, &str), ParseError> {
    let mut parts = request.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(_protocol)) => Ok((method, path)),
        _ => Err(ParseError::MalformedRequest(request.to_string())),
    }
}

pub(crate) fn invalid_timestamp(value: &str, err: chrono::ParseError) -> ParseError {
    ParseError::InvalidTimestamp {
        value: value.to_string(),
        reason: err.to_string(),
    }
}
