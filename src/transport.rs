//! The shared log that connects a trace producer to its monitors.
//!
//! The producer appends one record per line and never rewrites. Each reader
//! owns a [`Cursor`] holding the byte offset it has consumed up to, so
//! several monitors can follow the same file independently.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{MonitorError, Result};
use crate::snapshot::{self, Snapshot};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    offset: u64,
}
impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| MonitorError::Transport(format!("cannot open {}: {}", path.display(), e)))
}

/// Reads the next complete record after the cursor, if one has been
/// written. A trailing line without its newline is left for a later call.
pub fn read_record(path: &Path, cursor: &mut Cursor) -> Result<Option<Snapshot>> {
    let mut reader = BufReader::new(open(path)?);
    reader.seek(SeekFrom::Start(cursor.offset))?;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 || !line.ends_with('\n') {
            return Ok(None);
        }
        let start = cursor.offset;
        cursor.offset += read as u64;
        if line.trim().is_empty() {
            continue;
        }
        return snapshot::decode(&line, start).map(Some);
    }
}

/// Blocks until the next record is available, checking every `interval`.
pub fn poll_record(path: &Path, cursor: &mut Cursor, interval: Duration) -> Result<Snapshot> {
    loop {
        if let Some(record) = read_record(path, cursor)? {
            return Ok(record);
        }
        trace!(offset = cursor.offset, "waiting for the next record");
        thread::sleep(interval);
    }
}

/// Appends a record, the producer side of the log.
pub fn append_record(path: &Path, record: &Snapshot) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", snapshot::encode(record))?;
    Ok(())
}
