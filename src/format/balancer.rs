// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! haproxy HTTP log lines.

use chrono::NaiveDateTime;

use super::{invalid_timestamp, split_request, FormatParser};
use crate::error::ParseError;
use crate::types::LogEntry;

pub(crate) const SAMPLE: &str = r#"<142>Sep 27 00:15:57 haproxy[28513]: 67.188.214.167:64531 [27/Sep/2013:00:15:43.494] frontend~ test/10.127.57.177-10000 449/0/0/13531/13980 200 13824 - - ---- 6/6/0/1/0 0/0 "GET / HTTP/1.1""#;

/// Accept date, e.g. `27/Sep/2013:00:15:43.494`. Carries no offset; read as UTC.
const ACCEPT_DATE_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, Default)]
pub struct BalancerParser;

impl FormatParser for BalancerParser {
    fn parse(&self, line: &str) -> Result<LogEntry, ParseError> {
        let date_start = line.rfind('[').map_or(0, |i| i + 1);
        let date_end = match line.rfind(']') {
            Some(end) if end >= date_start => end,
            end => {
                return Err(ParseError::MalformedLine(format!(
                    "issue with date indexes, start: {}, end: {:?}, len: {}",
                    date_start,
                    end,
                    line.len()
                )));
            }
        };

        // The request is the first quoted segment and runs to the closing
        // quote at the end of the line.
        let request_start = match line.find('"') {
            Some(i) if i + 1 < line.len() => i + 1,
            start => {
                return Err(ParseError::MalformedLine(format!(
                    "issue with request indexes, start: {:?}, len: {}",
                    start,
                    line.len()
                )));
            }
        };
        let request = &line[request_start..];
        let request = request.strip_suffix('"').unwrap_or(request);

        let (method, path) = split_request(request)?;

        let date = &line[date_start..date_end];
        let timestamp = NaiveDateTime::parse_from_str(date, ACCEPT_DATE_LAYOUT)
            .map_err(|e| invalid_timestamp(date, e))?
            .and_utc()
            .fixed_offset();

        Ok(LogEntry::new(timestamp, method, path, ""))
    }
}
