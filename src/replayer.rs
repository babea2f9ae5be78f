// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Replay engine with timing-faithful pacing
//!
//! One control path pulls entries in log order, sleeps out the gap between
//! consecutive timestamps (divided by the configured ratio) and spawns an
//! independent dispatch task per entry. Outcomes flow through a channel into
//! the [`ResultSink`]. Shutdown runs to completion:
//!
//! 1. the scheduler stops pulling at end of input (or on a fatal error),
//! 2. the coordinator waits for the in-flight counter to reach zero,
//! 3. the outcome channel is closed,
//! 4. the sink drains, flushes and reports.
//!
//! A fatal read error is returned only after these steps, so every outcome
//! already produced is written.

use chrono::{DateTime, FixedOffset};
use std::io::Write;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;
use crate::dispatch::{BoundedDispatcher, Dispatcher, HttpDispatcher};
use crate::error::ReplayError;
use crate::reader::{EntryReader, LineEntryReader};
use crate::shutdown::InFlight;
use crate::sink::ResultSink;
use crate::types::{LogEntry, ReplayOutcome};

/// Final counts for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Entries handed to a dispatch task
    pub dispatched: u64,
    /// Malformed lines skipped (only with `skip_malformed`)
    pub skipped: u64,
    /// Outcome lines written
    pub recorded: u64,
    /// Outcome lines carrying an error
    pub failed: u64,
}

/// Pacing clock: remembers the timestamp of the last entry seen.
#[derive(Debug, Clone)]
pub struct Pacer {
    last: Option<DateTime<FixedOffset>>,
    ratio: u32,
}

impl Pacer {
    pub fn new(ratio: u32) -> Self {
        Self {
            last: None,
            ratio: ratio.max(1),
        }
    }

    /// Delay to wait before dispatching an entry stamped `timestamp`.
    ///
    /// Returns `None` when the entry is not paced, when it is the first entry,
    /// or when its timestamp is not after the previous one. The clock always
    /// advances to `timestamp`.
    pub fn next_delay(&mut self, timestamp: DateTime<FixedOffset>, paced: bool) -> Option<Duration> {
        let delay = match self.last {
            Some(last) if paced => (timestamp - last)
                .to_std()
                .ok()
                .filter(|d| !d.is_zero())
                .map(|d| d / self.ratio),
            _ => None,
        };
        self.last = Some(timestamp);
        delay
    }

    pub fn last_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.last
    }
}

/// Single control path: pulls, paces and spawns.
pub struct Scheduler {
    config: Arc<ReplayConfig>,
    dispatcher: Arc<dyn Dispatcher>,
    in_flight: InFlight,
    pacer: Pacer,
    dispatched: u64,
    skipped: u64,
}

impl Scheduler {
    pub fn new(config: Arc<ReplayConfig>, dispatcher: Arc<dyn Dispatcher>, in_flight: InFlight) -> Self {
        let pacer = Pacer::new(config.ratio);
        Self {
            config,
            dispatcher,
            in_flight,
            pacer,
            dispatched: 0,
            skipped: 0,
        }
    }

    /// Drive `reader` to the end of input.
    ///
    /// Returns early if the sink stops (a write failure) or on a fatal read
    /// error; dispatch tasks already spawned keep running either way.
    pub async fn run<R>(&mut self, reader: R, outcomes: &Sender<ReplayOutcome>, sink: &ResultSink) -> Result<(), ReplayError>
    where
        R: EntryReader + 'static,
    {
        let mut entries = spawn_feeder(reader);

        while let Some(next) = entries.recv().await {
            if sink.is_finished() {
                warn!("Result sink stopped, no further requests will be sent");
                return Ok(());
            }

            let entry = match next {
                Ok(entry) => entry,
                Err(e) if self.config.skip_malformed && e.is_skippable() => {
                    warn!("Skipping malformed entry: {}", e);
                    self.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let paced = self.config.paces(&entry);
            match self.pacer.next_delay(entry.timestamp, paced) {
                Some(delay) => {
                    debug!("Sleeping for: {:.2} seconds", delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                }
                None if paced => debug!("No need for sleep!"),
                None => {}
            }

            self.spawn_dispatch(entry, outcomes.clone());
        }

        info!("Reached end of input after {} entries", self.dispatched);
        Ok(())
    }

    fn spawn_dispatch(&mut self, entry: LogEntry, outcomes: Sender<ReplayOutcome>) {
        let guard = self.in_flight.start();
        let dispatcher = Arc::clone(&self.dispatcher);
        self.dispatched += 1;

        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(entry).await;
            if outcomes.send(outcome).is_err() {
                warn!("Result sink is gone, dropping outcome");
            }
            drop(outcomes);
            drop(guard);
        });
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// Run the blocking reader on its own thread, handing entries over one at a
/// time. The channel closes at end of input or right after an error.
fn spawn_feeder<R>(mut reader: R) -> mpsc::Receiver<Result<LogEntry, ReplayError>>
where
    R: EntryReader + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    thread::spawn(move || loop {
        let next = match reader.read_entry() {
            Ok(Some(entry)) => Ok(entry),
            Ok(None) => break,
            Err(e) => Err(e),
        };
        let stop = next.as_ref().is_err_and(|e| !e.is_skippable());
        if tx.blocking_send(next).is_err() || stop {
            break;
        }
    });
    rx
}

/// Build the dispatcher described by `config`.
pub fn dispatcher_for(config: &ReplayConfig) -> Result<Arc<dyn Dispatcher>, ReplayError> {
    let http = HttpDispatcher::new(config.prefix.clone(), config.timeout)?;
    let dispatcher: Arc<dyn Dispatcher> = match config.max_in_flight {
        Some(limit) => {
            info!("Limiting replay to {} concurrent requests", limit);
            Arc::new(BoundedDispatcher::new(http, limit))
        }
        None => Arc::new(http),
    };
    Ok(dispatcher)
}

/// Replay using the input, output and HTTP target named in `config`.
pub async fn replay(config: ReplayConfig) -> Result<ReplaySummary, ReplayError> {
    config.validate()?;

    debug!("Parsing {:?} as {} log", config.input, config.format.file_type());

    let input = config.input.open(&config.format)?;
    let reader = LineEntryReader::for_format(input, &config.format)?;
    let writer = config.output.create()?;
    let dispatcher = dispatcher_for(&config)?;

    replay_with(config, reader, dispatcher, writer).await
}

/// Replay from an arbitrary reader through an arbitrary dispatcher into an
/// arbitrary writer.
pub async fn replay_with<R, W>(
    config: ReplayConfig,
    reader: R,
    dispatcher: Arc<dyn Dispatcher>,
    writer: W,
) -> Result<ReplaySummary, ReplayError>
where
    R: EntryReader + 'static,
    W: Write + Send + 'static,
{
    config.validate()?;
    let config = Arc::new(config);

    let (outcomes, sink) = ResultSink::spawn(writer);
    let in_flight = InFlight::new();
    let mut scheduler = Scheduler::new(Arc::clone(&config), dispatcher, in_flight.clone());

    let run = scheduler.run(reader, &outcomes, &sink).await;
    if let Err(ref e) = run {
        warn!("Stopping replay: {}", e);
    }

    debug!("Waiting for {} in-flight requests to finish", in_flight.count());
    in_flight.wait_idle().await;

    // Last sender held outside the dispatch tasks; the sink sees the end of
    // the stream once this is gone.
    drop(outcomes);

    debug!("Waiting for result sink to finish");
    let sink_stats = tokio::task::spawn_blocking(move || sink.finish())
        .await
        .map_err(|_| ReplayError::SinkPanicked)?;

    run?;
    let sink_stats = sink_stats?;

    if sink_stats.recorded != scheduler.dispatched() {
        warn!(
            "Dispatched {} requests but recorded {} outcomes",
            scheduler.dispatched(),
            sink_stats.recorded
        );
    }

    Ok(ReplaySummary {
        dispatched: scheduler.dispatched(),
        skipped: scheduler.skipped(),
        recorded: sink_stats.recorded,
        failed: sink_stats.failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64, millis: u32) -> DateTime<FixedOffset> {
        let base = DateTime::parse_from_rfc3339("2013-11-08T13:39:18+00:00").unwrap();
        base + chrono::Duration::seconds(secs) + chrono::Duration::milliseconds(millis as i64)
    }

    #[test]
    fn test_first_entry_is_never_delayed() {
        let mut pacer = Pacer::new(1);
        assert_eq!(pacer.last_timestamp(), None);
        assert_eq!(pacer.next_delay(at(0, 0), true), None);
        assert_eq!(pacer.last_timestamp(), Some(at(0, 0)));
    }

    #[test]
    fn test_delay_divided_by_ratio() {
        let mut pacer = Pacer::new(4);
        pacer.next_delay(at(0, 0), true);
        assert_eq!(pacer.next_delay(at(2, 0), true), Some(Duration::from_millis(500)));
        assert_eq!(pacer.next_delay(at(2, 400), true), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_out_of_order_and_equal_timestamps_do_not_sleep() {
        let mut pacer = Pacer::new(1);
        pacer.next_delay(at(10, 0), true);
        assert_eq!(pacer.next_delay(at(5, 0), true), None);
        assert_eq!(pacer.last_timestamp(), Some(at(5, 0)));
        assert_eq!(pacer.next_delay(at(5, 0), true), None);
        assert_eq!(pacer.next_delay(at(6, 0), true), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_unpaced_entry_still_advances_clock() {
        let mut pacer = Pacer::new(1);
        pacer.next_delay(at(0, 0), true);
        // a POST in between is not paced but moves the clock
        assert_eq!(pacer.next_delay(at(30, 0), false), None);
        assert_eq!(pacer.next_delay(at(31, 0), true), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_ratio_treated_as_one() {
        let mut pacer = Pacer::new(0);
        pacer.next_delay(at(0, 0), true);
        assert_eq!(pacer.next_delay(at(1, 0), true), Some(Duration::from_secs(1)));
    }
}
