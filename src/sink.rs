// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Result sink: a background writer thread that drains replay outcomes from a
//! channel and writes one line per outcome, in arrival order.
//!
//! The channel closes once every sender is dropped. The scheduler keeps one
//! sender and hands a clone to each dispatch task, so the sink only sees the
//! end of the stream after the coordinator has released its sender and the
//! last task has finished.

use std::convert::Infallible;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use crate::error::ReplayError;
use crate::types::ReplayOutcome;

/// `--log` value meaning "write to standard output".
pub const STDOUT_SENTINEL: &str = "-";

/// Where outcome lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl FromStr for OutputTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            STDOUT_SENTINEL => OutputTarget::Stdout,
            path => OutputTarget::File(PathBuf::from(path)),
        })
    }
}

impl OutputTarget {
    /// Open the destination, creating (and truncating) a file target.
    pub fn create(&self) -> Result<Box<dyn Write + Send>, ReplayError> {
        match self {
            OutputTarget::Stdout => Ok(Box::new(io::stdout())),
            OutputTarget::File(path) => {
                let file = File::create(path).map_err(|source| ReplayError::OutputOpen {
                    path: path.clone(),
                    source,
                })?;
                info!("Writing replay results to {:?}", path);
                Ok(Box::new(file))
            }
        }
    }
}

/// Counts reported by the sink once drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Lines written
    pub recorded: u64,
    /// Lines carrying an error
    pub failed: u64,
}

/// Handle on the background writer.
#[derive(Debug)]
pub struct ResultSink {
    handle: JoinHandle<Result<SinkStats, ReplayError>>,
}

impl ResultSink {
    /// Spawn the writer thread, returning the outcome sender and the handle.
    pub fn spawn<W>(writer: W) -> (Sender<ReplayOutcome>, ResultSink)
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = channel::<ReplayOutcome>();
        let handle = thread::spawn(move || drain(receiver, writer));
        (sender, ResultSink { handle })
    }

    /// True if the writer thread has exited. Before the channel is closed this
    /// only happens on a write failure.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the writer has seen the channel close and flushed.
    pub fn finish(self) -> Result<SinkStats, ReplayError> {
        self.handle.join().map_err(|_| ReplayError::SinkPanicked)?
    }
}

fn drain<W: Write>(receiver: Receiver<ReplayOutcome>, writer: W) -> Result<SinkStats, ReplayError> {
    let mut out = BufWriter::new(writer);
    let mut stats = SinkStats::default();

    loop {
        // Flush whenever the channel runs dry so output keeps up with a slow
        // replay without a syscall per line under load.
        let outcome = match receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => {
                out.flush().map_err(ReplayError::SinkWrite)?;
                match receiver.recv() {
                    Ok(outcome) => outcome,
                    Err(_) => break,
                }
            }
            Err(TryRecvError::Disconnected) => break,
        };

        out.write_all(outcome.to_line().as_bytes())
            .map_err(ReplayError::SinkWrite)?;
        stats.recorded += 1;
        if outcome.is_failure() {
            stats.failed += 1;
        }
    }

    out.flush().map_err(ReplayError::SinkWrite)?;
    debug!("Result sink closed after {} outcomes", stats.recorded);
    Ok(stats)
}
