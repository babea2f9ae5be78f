// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! solr query-log lines
//!
//! Queries are replayed as form-encoded POSTs so long parameter lists never
//! hit URL length limits. The body is the content of the single `{...}` group
//! in the `params=` token and the path comes from the `path=` token.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{invalid_timestamp, FormatParser};
use crate::error::ParseError;
use crate::types::LogEntry;

pub(crate) const SAMPLE: &str = "2019-03-01 10:15:32,118 INFO  (qtp1489069835-21) [c:products s:shard1 r:core_node2 x:products_shard1_replica_n1] o.a.s.c.S.Request [products_shard1_replica_n1]  webapp=/solr path=/select params={q=title:phone&rows=10&wt=json} hits=42 status=0 QTime=3";

/// Leading timestamp, e.g. `2019-03-01 10:15:32.118` once the comma is swapped.
const TIMESTAMP_LEN: usize = 23;
const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f";

static PAYLOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(.*)\}").expect("static regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParser;

/// Extract the body of the single brace group in a `params=` token.
pub fn parse_payload(params: &str) -> Result<&str, ParseError> {
    let inner = PAYLOAD_RE
        .captures(params)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ParseError::PayloadNotFound(params.to_string()))?;

    // The greedy match spans first '{' to last '}'; reject `{a}{b}` and
    // unbalanced leftovers.
    let mut depth: i32 = 0;
    for c in inner.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(ParseError::PayloadNotFound(params.to_string()));
        }
    }
    if depth != 0 {
        return Err(ParseError::PayloadNotFound(params.to_string()));
    }

    Ok(inner)
}

impl FormatParser for SearchParser {
    fn parse(&self, line: &str) -> Result<LogEntry, ParseError> {
        let date = line.get(..TIMESTAMP_LEN).ok_or_else(|| {
            ParseError::MalformedLine("line does not seem to contain a valid timestamp".to_string())
        })?;
        let date = date.replace(',', ".");

        let mut path_token = None;
        let mut params_token = None;
        for part in line.split(' ') {
            if part.starts_with("path") {
                path_token = Some(part);
            } else if part.starts_with("params") {
                params_token = Some(part);
            }
        }

        let payload = parse_payload(params_token.unwrap_or_default())?;

        let path = path_token
            .and_then(|p| p.split_once('='))
            .map(|(_, path)| path)
            .ok_or_else(|| ParseError::MalformedLine("no path= token in query log line".to_string()))?;

        let timestamp = NaiveDateTime::parse_from_str(&date, TIMESTAMP_LAYOUT)
            .map_err(|e| invalid_timestamp(&date, e))?
            .and_utc()
            .fixed_offset();

        Ok(LogEntry::new(timestamp, "POST", path, payload))
    }
}
