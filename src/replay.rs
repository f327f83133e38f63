//! Status snapshot sources
//!
//! The live network feed is not part of this crate. A [`StatusSource`] is
//! anything that can produce snapshots one after another; [`ReplaySource`]
//! reads them back from a JSON-lines capture so the whole pipeline can be
//! driven from a file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::status::DeviceStatus;
use crate::types::Milliseconds;

/// Longest pause inserted between two snapshots when pacing a replay.
const MAX_REPLAY_GAP: Duration = Duration::from_secs(5);

/// Produces device status snapshots in arrival order.
pub trait StatusSource {
    /// Next snapshot, or `None` once the source is exhausted.
    fn next_status(&mut self) -> Result<Option<DeviceStatus>>;
}

/// Reads one JSON-encoded [`DeviceStatus`] per line.
///
/// Blank lines and lines starting with `#` are skipped. With pacing
/// enabled the source sleeps for the timestamp gap between consecutive
/// snapshots, capped at a few seconds.
pub struct ReplaySource<R> {
    reader: R,
    realtime: bool,
    line_number: usize,
    last_timestamp: Option<Milliseconds>,
}

impl ReplaySource<BufReader<File>> {
    /// Open a capture file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        debug!("Replaying snapshots from {:?}", path);
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            realtime: false,
            line_number: 0,
            last_timestamp: None,
        }
    }

    /// Sleep between snapshots according to their timestamps.
    #[must_use]
    pub const fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    fn pace(&mut self, status: &DeviceStatus) {
        if let Some(previous) = self.last_timestamp {
            let gap = (status.timestamp - previous).to_std();
            if self.realtime && !gap.is_zero() {
                thread::sleep(gap.min(MAX_REPLAY_GAP));
            }
        }
        self.last_timestamp = Some(status.timestamp);
    }
}

impl<R: BufRead> StatusSource for ReplaySource<R> {
    fn next_status(&mut self) -> Result<Option<DeviceStatus>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let status: DeviceStatus =
                serde_json::from_str(trimmed).map_err(|source| Error::Json {
                    line: self.line_number,
                    source,
                })?;
            self.pace(&status);
            return Ok(Some(status));
        }
    }
}
