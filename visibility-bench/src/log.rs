//! Append-only record logs.
//!
//! The producer and the detector each own one log and only ever append to it. A record is
//! written with a single `write_all` of the complete line followed by a flush, so an interrupted
//! run leaves a log that is truncated but valid. Readers ignore a trailing line that lacks its
//! newline, in case a process died in the middle of a write.
//!
//! Every run opens its log with a `#` header line. Logs are never truncated, so a log holds the
//! records of all runs that used it, and a header marks where the next run begins.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{HarnessError, HarnessResult};
use crate::records::Record;

/// An open log that records of type `R` are appended to.
#[derive(Debug)]
pub struct RecordLog<R> {
    path: PathBuf,
    file: File,
    last_index: Option<u64>,
    _record: PhantomData<fn(&R)>,
}

impl<R: Record> RecordLog<R> {
    /// Opens the log at the given path for appending, creating it if necessary.
    ///
    /// When `header` is given, it is written as a `#` comment line first.
    pub async fn open(path: impl Into<PathBuf>, header: Option<&str>) -> HarnessResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|err| HarnessError::log(&path, err))?;

        let mut log = Self {
            path,
            file,
            last_index: None,
            _record: PhantomData,
        };
        if let Some(header) = header {
            log.write_line(&format!("# {header}")).await?;
        }
        Ok(log)
    }

    /// The path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record and flushes it to the file.
    pub async fn append(&mut self, record: &R) -> HarnessResult<()> {
        debug_assert!(
            self.last_index.is_none_or(|last| last < record.index()),
            "records must be appended in increasing index order"
        );
        self.write_line(&record.to_line()).await?;
        self.last_index = Some(record.index());
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> HarnessResult<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        self.file
            .write_all(buf.as_bytes())
            .await
            .map_err(|err| HarnessError::log(&self.path, err))?;
        self.file
            .flush()
            .await
            .map_err(|err| HarnessError::log(&self.path, err))
    }
}

/// Reads the complete records of the last run from the log at the given path.
///
/// A `#` header line starts a new run and discards the records read so far. Empty lines are
/// skipped.
pub fn read_log<R: Record>(path: &Path) -> HarnessResult<Vec<R>> {
    let contents = std::fs::read_to_string(path).map_err(|err| HarnessError::log(path, err))?;

    let mut lines: Vec<&str> = contents.split('\n').collect();
    // `split` yields an empty tail after the final newline, or the incomplete last line.
    if let Some(tail) = lines.pop()
        && !tail.is_empty()
    {
        tracing::warn!(path = %path.display(), "ignoring incomplete last line");
    }

    let mut records = Vec::with_capacity(lines.len());
    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.starts_with('#') {
            records.clear();
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let record = R::parse_line(line).map_err(|message| HarnessError::Parse {
            path: path.into(),
            line: idx + 1,
            message,
        })?;
        records.push(record);
    }

    Ok(records)
}
