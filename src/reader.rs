// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Entry readers: pull raw lines from a byte stream and run them through the
//! selected format parser, one entry at a time.

use std::io::BufRead;
use tracing::trace;

use crate::error::ReplayError;
use crate::format::{FormatParser, LogFormat};
use crate::types::LogEntry;

/// Source of normalized entries consumed by the scheduler.
pub trait EntryReader: Send {
    /// Next entry, or `Ok(None)` once the input is exhausted.
    fn read_entry(&mut self) -> Result<Option<LogEntry>, ReplayError>;

    /// 1-based number of the last line pulled from the input.
    fn line_number(&self) -> usize;
}

/// Line-oriented reader over any buffered byte stream.
pub struct LineEntryReader<R> {
    input: R,
    parser: Box<dyn FormatParser>,
    buf: String,
    line_no: usize,
}

impl<R: BufRead + Send> LineEntryReader<R> {
    pub fn new(input: R, parser: Box<dyn FormatParser>) -> Self {
        Self {
            input,
            parser,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Reader bound to the parser for `format`.
    pub fn for_format(input: R, format: &LogFormat) -> Result<Self, ReplayError> {
        Ok(Self::new(input, format.parser()?))
    }
}

impl<R: BufRead + Send> EntryReader for LineEntryReader<R> {
    fn read_entry(&mut self) -> Result<Option<LogEntry>, ReplayError> {
        loop {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                trace!("skipping blank line {}", self.line_no);
                continue;
            }

            return self
                .parser
                .parse(line)
                .map(Some)
                .map_err(|source| ReplayError::Parse {
                    line: self.line_no,
                    source,
                });
        }
    }

    fn line_number(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead + Send> Iterator for LineEntryReader<R> {
    type Item = Result<LogEntry, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_entry().transpose()
    }
}
