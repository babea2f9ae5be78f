// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! CLI for replaying access logs against a target server.
//!
//! Examples:
//! ```bash
//! log-replay --file access.log.gz --prefix http://staging:8080            # nginx, original speed
//! log-replay --file-type haproxy --file haproxy.log --ratio 10            # 10x faster
//! zcat solr.log.gz | log-replay --file-type solr --skip-sleep --log out.tsv
//! log-replay --file dummy --file-type haproxy --debug                     # built-in sample
//! ```
//!
//! Each replayed request produces one line on stdout (or `--log FILE`):
//! `status  start_unix  latency_ns  path  payload  [error]`

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use log_replay::{
    parse_timeout, replay, InputSource, LogFormat, OutputTarget, ReplayConfig, DEFAULT_ACCESS_FORMAT,
    DEFAULT_PREFIX,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// nginx log format
    #[arg(long, env = "LOG_REPLAY_FORMAT", default_value = DEFAULT_ACCESS_FORMAT)]
    format: String,

    /// Log file name to read. Read from STDIN if file name is '-', use a built-in sample line if 'dummy'
    #[arg(long, env = "LOG_REPLAY_FILE", default_value = "-")]
    file: String,

    /// File to report timings to, default is stdout
    #[arg(long, env = "LOG_REPLAY_LOG", default_value = "-")]
    log: String,

    /// URL prefix to query
    #[arg(long, env = "LOG_REPLAY_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Input log type (nginx, haproxy or solr)
    #[arg(long = "file-type", env = "LOG_REPLAY_FILE_TYPE", default_value = "nginx")]
    file_type: String,

    /// Replay speed ratio, higher means faster replay speed
    #[arg(long, env = "LOG_REPLAY_RATIO", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    ratio: u32,

    /// Print extra debugging information
    #[arg(long, env = "LOG_REPLAY_DEBUG")]
    debug: bool,

    /// Request timeout in milliseconds (or a duration such as `90s`), 0 means no timeout
    #[arg(long, env = "LOG_REPLAY_TIMEOUT", default_value = "60000", value_parser = parse_timeout)]
    timeout: Duration,

    /// Skip sleep between http calls based on log timestamps
    #[arg(long = "skip-sleep", env = "LOG_REPLAY_SKIP_SLEEP")]
    skip_sleep: bool,

    /// Cap on concurrent requests; unlimited if not provided
    #[arg(long = "max-in-flight", env = "LOG_REPLAY_MAX_IN_FLIGHT",
          value_parser = clap::value_parser!(u64).range(1..))]
    max_in_flight: Option<u64>,

    /// Skip lines that cannot be parsed instead of aborting (bad timestamps still abort)
    #[arg(long = "skip-malformed", env = "LOG_REPLAY_SKIP_MALFORMED")]
    skip_malformed: bool,

    /// Increase log verbosity: -v = Info, -vv = Debug
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> Result<ReplayConfig> {
        let format = LogFormat::from_file_type(&self.file_type, &self.format)?;
        let input: InputSource = self.file.parse()?;
        let output: OutputTarget = self.log.parse()?;

        Ok(ReplayConfig {
            format,
            input,
            prefix: self.prefix,
            ratio: self.ratio,
            skip_sleep: self.skip_sleep,
            timeout: self.timeout,
            output,
            debug: self.debug,
            max_in_flight: self.max_in_flight.map(|n| n as usize),
            skip_malformed: self.skip_malformed,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match (cli.debug, cli.verbose) {
        (true, _) => "debug",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };

    // Diagnostics go to stderr; stdout carries the replay results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.into_config()?;
    info!(
        "Replaying {} log from {:?} against {} (ratio {}, skip sleep {})",
        config.format.file_type(),
        config.input,
        config.prefix,
        config.ratio,
        config.skip_sleep
    );

    let summary = replay(config).await.context("replay failed")?;

    info!(
        "Replay complete: {} dispatched, {} recorded, {} failed, {} skipped",
        summary.dispatched, summary.recorded, summary.failed, summary.skipped
    );
    Ok(())
}
