// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Error types shared by the readers, the scheduler and the result sink.

use std::path::PathBuf;
use thiserror::Error;

/// Per-line failure produced by a format parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The HTTP request line did not split into method, path and protocol.
    #[error("malformed request line: {0:?}")]
    MalformedRequest(String),

    /// Bracket or quote positions in a raw line are inconsistent.
    #[error("malformed line: {0}")]
    MalformedLine(String),

    /// The `params` token did not hold exactly one `{...}` group.
    #[error("unable to find query payload in {0:?}")]
    PayloadNotFound(String),

    /// The access-log tokenizer produced no value for a required field.
    #[error("field {0:?} not found in record")]
    MissingField(String),

    /// The line does not match the configured access-log format.
    #[error("line does not match log format: {0:?}")]
    LineMismatch(String),

    /// A timestamp could not be decoded. Always stops the run.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

impl ParseError {
    /// Whether this failure must abort the run even when malformed lines
    /// are being skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::InvalidTimestamp { .. })
    }
}

/// Run-level failure.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open input {path:?}: {source}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create output {path:?}: {source}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write replay result: {0}")]
    SinkWrite(#[source] std::io::Error),

    #[error("result sink terminated unexpectedly")]
    SinkPanicked,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown file type {0:?}, expected one of nginx, haproxy or solr")]
    UnknownFormat(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ReplayError {
    /// Whether the reader may continue past this error when malformed lines
    /// are being skipped.
    pub fn is_skippable(&self) -> bool {
        match self {
            ReplayError::Parse { source, .. } => !source.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T, E = ReplayError> = std::result::Result<T, E>;
