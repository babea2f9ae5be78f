// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! nginx access-log parsing driven by a `log_format` string
//!
//! The format string is compiled once into an anchored regex: every
//! `$variable` becomes a named capture that runs up to the literal character
//! following it in the format, and all other text must match literally.

use chrono::DateTime;
use regex::{Captures, Regex};

use super::{invalid_timestamp, split_request, FormatParser};
use crate::error::ParseError;
use crate::types::LogEntry;

pub(crate) const SAMPLE: &str = r#"89.234.89.123 [08/Nov/2013:13:39:18 +0000] "GET /t/100x100/foo/bar.jpeg HTTP/1.1" 200 1027 2430 0.014 "100x100" 10 1"#;

/// `$time_local` layout, e.g. `08/Nov/2013:13:39:18 +0000`
const TIME_LOCAL_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Compiled nginx `log_format`.
#[derive(Debug, Clone)]
pub struct AccessFormat {
    regex: Regex,
    fields: Vec<String>,
}

impl AccessFormat {
    pub fn compile(format: &str) -> Result<Self, regex::Error> {
        let chars: Vec<char> = format.chars().collect();
        let mut pattern = String::from("^");
        let mut fields = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let name_len = if c == '$' {
                chars[i + 1..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '_')
                    .count()
            } else {
                0
            };

            if name_len == 0 {
                pattern.push_str(&regex::escape(&c.to_string()));
                i += 1;
                continue;
            }

            let name: String = chars[i + 1..i + 1 + name_len].iter().collect();
            i += 1 + name_len;

            match chars.get(i) {
                Some('$') | None => pattern.push_str(&format!("(?P<{name}>.*)")),
                Some(delim) => {
                    let delim = regex::escape(&delim.to_string());
                    pattern.push_str(&format!("(?P<{name}>[^{delim}]*)"));
                }
            }
            fields.push(name);
        }
        pattern.push('$');

        Ok(Self {
            regex: Regex::new(&pattern)?,
            fields,
        })
    }

    /// Variable names in format order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Split a line into named fields; `None` if it does not fit the format.
    pub fn tokenize<'a>(&self, line: &'a str) -> Option<AccessRecord<'a>> {
        self.regex.captures(line).map(|captures| AccessRecord { captures })
    }
}

/// One tokenized access-log line.
#[derive(Debug)]
pub struct AccessRecord<'a> {
    captures: Captures<'a>,
}

impl<'a> AccessRecord<'a> {
    pub fn field(&self, name: &str) -> Result<&'a str, ParseError> {
        self.captures
            .name(name)
            .map(|m| m.as_str())
            .ok_or_else(|| ParseError::MissingField(name.to_string()))
    }
}

/// Parser for nginx access logs.
#[derive(Debug, Clone)]
pub struct AccessParser {
    format: AccessFormat,
}

impl AccessParser {
    pub fn new(format: AccessFormat) -> Self {
        Self { format }
    }
}

impl FormatParser for AccessParser {
    fn parse(&self, line: &str) -> Result<LogEntry, ParseError> {
        let record = self
            .format
            .tokenize(line)
            .ok_or_else(|| ParseError::LineMismatch(line.to_string()))?;

        let time_local = record.field("time_local")?;
        let request = record.field("request")?;
        let (method, path) = split_request(request)?;

        let timestamp = DateTime::parse_from_str(time_local, TIME_LOCAL_LAYOUT)
            .map_err(|e| invalid_timestamp(time_local, e))?;

        Ok(LogEntry::new(timestamp, method, path, ""))
    }
}
