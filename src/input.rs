// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Opening the replay input: stdin, a (possibly compressed) file, or the
//! built-in sample line for the selected format.

use std::convert::Infallible;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use tracing::info;

use crate::error::ReplayError;
use crate::format::LogFormat;

/// `--file` value meaning "read standard input".
pub const STDIN_SENTINEL: &str = "-";
/// `--file` value meaning "use the built-in sample line".
pub const SAMPLE_SENTINEL: &str = "dummy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    Sample,
    File(PathBuf),
}

impl FromStr for InputSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            STDIN_SENTINEL => InputSource::Stdin,
            SAMPLE_SENTINEL => InputSource::Sample,
            path => InputSource::File(PathBuf::from(path)),
        })
    }
}

/// Compression applied to an input file, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") => Compression::Zstd,
            _ => Compression::None,
        }
    }
}

impl InputSource {
    /// Open the source as a buffered line stream.
    pub fn open(&self, format: &LogFormat) -> Result<Box<dyn BufRead + Send>, ReplayError> {
        match self {
            InputSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            InputSource::Sample => Ok(Box::new(Cursor::new(format.sample()))),
            InputSource::File(path) => open_file(path),
        }
    }
}

fn open_file(path: &Path) -> Result<Box<dyn BufRead + Send>, ReplayError> {
    let open_err = |source| ReplayError::InputOpen {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_err)?;
    let compression = Compression::from_path(path);

    info!("Reading {:?} (compression: {:?})", path, compression);

    let reader: Box<dyn BufRead + Send> = match compression {
        Compression::None => Box::new(BufReader::new(file)),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Compression::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(file).map_err(open_err)?;
            Box::new(BufReader::new(decoder))
        }
    };
    Ok(reader)
}
