//! Records written by the producer and the detector, and their line format.
//!
//! Every record is one tab-separated line:
//!
//! - write log: `index  timestamp  digest  size`
//! - detection log: `index  timestamp  observed_size  outcome  attempts`
//!
//! Timestamps are RFC 3339 in UTC with millisecond precision.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::checksum::Digest;

/// Timestamp of a producer or detector event.
pub type Timestamp = DateTime<Utc>;

/// Formats a timestamp the way it is persisted in logs.
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("invalid timestamp {s:?}: {err}"))
}

fn parse_field<T: FromStr>(s: &str, name: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("invalid {name} {s:?}"))
}

fn split_fields<const N: usize>(line: &str) -> Result<[&str; N], String> {
    let fields: Vec<&str> = line.split('\t').collect();
    fields
        .try_into()
        .map_err(|fields: Vec<&str>| format!("expected {N} fields, found {}", fields.len()))
}

/// A line-oriented record that can be appended to a log.
pub trait Record: Sized {
    /// The sequence index of this record.
    fn index(&self) -> u64;

    /// Formats the record as a single line, without the trailing newline.
    fn to_line(&self) -> String;

    /// Parses a record from a single line.
    fn parse_line(line: &str) -> Result<Self, String>;
}

/// A completed write (or delete) made by the producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    pub index: u64,
    pub write_timestamp: Timestamp,
    pub digest: Digest,
    pub size_bytes: u64,
}

impl Record for WriteRecord {
    fn index(&self) -> u64 {
        self.index
    }

    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.index,
            format_timestamp(&self.write_timestamp),
            self.digest,
            self.size_bytes
        )
    }

    fn parse_line(line: &str) -> Result<Self, String> {
        let [index, timestamp, digest, size] = split_fields(line)?;
        Ok(Self {
            index: parse_field(index, "index")?,
            write_timestamp: parse_timestamp(timestamp)?,
            digest: parse_field(digest, "digest")?,
            size_bytes: parse_field(size, "size")?,
        })
    }
}

/// How polling for an item ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The complete payload became visible.
    Found,
    /// The item did not become visible within the wait budget.
    TimedOut,
    /// The wait budget ran out while the item was visible with the right size but wrong contents.
    Corrupted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Found => "found",
            Outcome::TimedOut => "timedout",
            Outcome::Corrupted => "corrupted",
        })
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "found" => Ok(Outcome::Found),
            "timedout" => Ok(Outcome::TimedOut),
            "corrupted" => Ok(Outcome::Corrupted),
            s => Err(format!("invalid outcome {s:?}")),
        }
    }
}

/// The result of polling for one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionRecord {
    pub index: u64,
    /// When the item was found, or when the detector gave up.
    pub detect_timestamp: Timestamp,
    /// The size of the last observation, zero if the item was never seen.
    pub observed_size: u64,
    /// The digest of the last fetched contents. Not persisted.
    pub observed_digest: Option<Digest>,
    /// The number of polls performed.
    pub attempts: u32,
    pub outcome: Outcome,
}

impl Record for DetectionRecord {
    fn index(&self) -> u64 {
        self.index
    }

    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.index,
            format_timestamp(&self.detect_timestamp),
            self.observed_size,
            self.outcome,
            self.attempts
        )
    }

    fn parse_line(line: &str) -> Result<Self, String> {
        let [index, timestamp, size, outcome, attempts] = split_fields(line)?;
        Ok(Self {
            index: parse_field(index, "index")?,
            detect_timestamp: parse_timestamp(timestamp)?,
            observed_size: parse_field(size, "size")?,
            observed_digest: None,
            attempts: parse_field(attempts, "attempts")?,
            outcome: outcome.parse()?,
        })
    }
}
