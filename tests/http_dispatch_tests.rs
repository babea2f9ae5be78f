// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Integration tests for HTTP dispatch against a local responder.

mod common;

use common::{columns, unreachable_prefix, SharedBuf, TestServer};
use log_replay::dispatch::{FORM_CONTENT_TYPE, USER_AGENT_VALUE};
use log_replay::{
    dispatcher_for, replay_with, Dispatcher, HttpDispatcher, LineEntryReader, LogEntry, LogFormat, ReplayConfig,
    FAILURE_STATUS,
};
use std::io::Cursor;
use std::time::Duration;

fn entry(method: &str, path: &str, payload: &str) -> LogEntry {
    let ts = chrono::DateTime::parse_from_rfc3339("2013-11-08T13:39:18+00:00").unwrap();
    LogEntry::new(ts, method, path, payload)
}

#[tokio::test]
async fn test_get_hits_prefix_and_path() {
    let server = TestServer::start(200).await;
    let dispatcher = HttpDispatcher::new(server.prefix(), Duration::from_secs(5)).unwrap();

    let outcome = dispatcher.dispatch(entry("GET", "/t/100x100/foo/bar.jpeg?x=1", "")).await;

    assert_eq!(outcome.status, 200);
    assert!(outcome.error.is_none());
    assert!(outcome.latency_ns > 0);
    assert_eq!(outcome.path, "/t/100x100/foo/bar.jpeg?x=1");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/t/100x100/foo/bar.jpeg?x=1");
    assert_eq!(requests[0].header("user-agent"), Some(USER_AGENT_VALUE));
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_search_post_sends_form_body() {
    let server = TestServer::start(200).await;
    let dispatcher = HttpDispatcher::new(server.prefix(), Duration::from_secs(5)).unwrap();

    let outcome = dispatcher
        .dispatch(entry("POST", "/select", "q=title:phone&rows=10&wt=json"))
        .await;
    assert_eq!(outcome.status, 200);

    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/select");
    assert_eq!(requests[0].header("content-type"), Some(FORM_CONTENT_TYPE));
    assert_eq!(requests[0].body, "q=title:phone&rows=10&wt=json");
}

#[tokio::test]
async fn test_server_status_is_recorded_verbatim() {
    let server = TestServer::start(404).await;
    let dispatcher = HttpDispatcher::new(server.prefix(), Duration::ZERO).unwrap();

    let outcome = dispatcher.dispatch(entry("GET", "/missing", "")).await;

    assert_eq!(outcome.status, 404);
    assert!(!outcome.is_failure());
}

#[tokio::test]
async fn test_unreachable_target_yields_failure_outcome() {
    let prefix = unreachable_prefix().await;
    let dispatcher = HttpDispatcher::new(prefix, Duration::from_secs(5)).unwrap();

    let outcome = dispatcher.dispatch(entry("GET", "/", "")).await;

    assert_eq!(outcome.status, FAILURE_STATUS);
    let error = outcome.error.clone().unwrap();
    assert!(!error.is_empty());
    assert!(!error.contains('\t') && !error.contains('\n'));
    assert_eq!(columns(outcome.to_line().trim_end()).len(), 6);
}

#[tokio::test]
async fn test_timeout_yields_failure_outcome() {
    let server = TestServer::start_with_delay(200, Duration::from_millis(500)).await;
    let dispatcher = HttpDispatcher::new(server.prefix(), Duration::from_millis(100)).unwrap();

    let outcome = dispatcher.dispatch(entry("GET", "/slow", "")).await;

    assert_eq!(outcome.status, FAILURE_STATUS);
    assert!(outcome.latency_ns >= Duration::from_millis(90).as_nanos());
    assert!(outcome.latency_ns < Duration::from_millis(500).as_nanos());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replay_against_server() {
    let server = TestServer::start(200).await;
    let config = ReplayConfig {
        format: LogFormat::Access { format: log_replay::DEFAULT_ACCESS_FORMAT.to_string() },
        prefix: server.prefix(),
        skip_sleep: true,
        max_in_flight: Some(2),
        ..Default::default()
    };

    let sample = config.format.sample();
    let text = format!("{sample}\n\n{sample}\n{}\n", sample.replace("/foo/bar.jpeg", "/baz.png"));
    let reader = LineEntryReader::for_format(Cursor::new(text), &config.format).unwrap();
    let dispatcher = dispatcher_for(&config).unwrap();
    let out = SharedBuf::default();

    let summary = replay_with(config, reader, dispatcher, out.clone()).await.unwrap();

    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.recorded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(server.requests().len(), 3);

    for line in out.lines() {
        let cols = columns(&line);
        assert_eq!(cols.len(), 5);
        assert_eq!(cols[0], "200");
        assert!(cols[1].parse::<i64>().unwrap() > 0);
        assert!(cols[2].parse::<u128>().is_ok());
    }
    let mut paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    paths.sort();
    assert_eq!(paths, vec!["/t/100x100/baz.png", "/t/100x100/foo/bar.jpeg", "/t/100x100/foo/bar.jpeg"]);
}

#[tokio::test]
async fn test_replay_continues_past_unreachable_target() {
    let config = ReplayConfig {
        format: LogFormat::Balancer,
        prefix: unreachable_prefix().await,
        skip_sleep: true,
        timeout: Duration::from_secs(5),
        ..Default::default()
    };

    let sample = config.format.sample();
    let text = format!("{sample}\n{sample}\n");
    let reader = LineEntryReader::for_format(Cursor::new(text), &config.format).unwrap();
    let dispatcher = dispatcher_for(&config).unwrap();
    let out = SharedBuf::default();

    let summary = replay_with(config, reader, dispatcher, out.clone()).await.unwrap();

    assert_eq!(summary.recorded, 2);
    assert_eq!(summary.failed, 2);
    for line in out.lines() {
        let cols = columns(&line);
        assert_eq!(cols[0], "500");
        assert_eq!(cols[3], "/");
        assert!(!cols[5].is_empty());
    }
}

#[tokio::test]
async fn test_replay_sample_input_into_file() {
    let server = TestServer::start(200).await;
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("timings.tsv");

    let config = ReplayConfig {
        format: LogFormat::Search,
        input: log_replay::InputSource::Sample,
        output: log_replay::OutputTarget::File(out_path.clone()),
        prefix: server.prefix(),
        ..Default::default()
    };

    let summary = log_replay::replay(config).await.unwrap();
    assert_eq!(summary.recorded, 1);

    let written = std::fs::read_to_string(&out_path).unwrap();
    let cols = columns(written.trim_end());
    assert_eq!(cols[0], "200");
    assert_eq!(cols[3], "/select");
    assert_eq!(cols[4], "q=title:phone&rows=10&wt=json");

    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].body, "q=title:phone&rows=10&wt=json");
}
