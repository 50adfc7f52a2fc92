//! A module for defining the [`Workload`] that producer and detector agree on.
//!
//! Producer and detector may run on different hosts without any channel between them. All they
//! share is the storage backend and a [`Workload`] built from the same settings: the key naming
//! convention, the number of items, the payload size and the payload seed. Since payload contents
//! are derived from the seed, the detector can recompute the digest of every item on its own.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::checksum::Digest;

/// The default seed for payload contents.
pub const DEFAULT_SEED: u64 = 0x5eed_0f_1a7e_c0de;

/// Which kind of change is measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The producer writes objects; they are visible once readable with the full payload.
    #[default]
    Write,
    /// The producer deletes objects; they are visible once reads no longer find them.
    Delete,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Write => f.write_str("write"),
            Mode::Delete => f.write_str("delete"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("write") => Ok(Mode::Write),
            s if s.eq_ignore_ascii_case("delete") => Ok(Mode::Delete),
            s => Err(format!(
                r#"invalid mode "{s}": expected one of "write", "delete""#
            )),
        }
    }
}

/// One unit of work, identified by its index in the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceItem {
    /// Position in the sequence, starting at 1. Joins write and detection records.
    pub index: u64,
    /// The size of the complete payload.
    pub expected_size: u64,
    /// The digest of the complete payload, if contents should be verified.
    pub expected_digest: Option<Digest>,
}

/// A builder for creating a [`Workload`].
#[derive(Debug)]
pub struct WorkloadBuilder {
    prefix: String,
    iterations: u64,
    payload_size: u64,
    seed: u64,
    verify_digest: bool,
}

impl WorkloadBuilder {
    /// The number of items in the sequence.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// The size of every payload. Zero produces empty objects.
    pub fn payload_size(mut self, size: u64) -> Self {
        self.payload_size = size;
        self
    }

    /// The seed that payload contents are derived from.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether detected objects must match the payload digest, not only its size.
    pub fn verify_digest(mut self, verify: bool) -> Self {
        self.verify_digest = verify;
        self
    }

    /// Creates the workload instance.
    pub fn build(self) -> Workload {
        Workload {
            prefix: self.prefix,
            iterations: self.iterations,
            payload_size: self.payload_size,
            seed: self.seed,
            verify_digest: self.verify_digest,
        }
    }
}

/// The sequence of named payloads shared by producer and detector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    prefix: String,
    iterations: u64,
    payload_size: u64,
    seed: u64,
    verify_digest: bool,
}

impl Workload {
    /// Constructs a new workload builder with the given key prefix.
    pub fn builder(prefix: impl Into<String>) -> WorkloadBuilder {
        WorkloadBuilder {
            prefix: prefix.into(),
            iterations: 10,
            payload_size: 1024 * 1024,
            seed: DEFAULT_SEED,
            verify_digest: true,
        }
    }

    /// The number of items in the sequence.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// The size of every payload in bytes.
    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    /// The storage key of the item at the given index.
    pub fn key(&self, index: u64) -> String {
        format!("{}{index:06}", self.prefix)
    }

    /// Generates the contents of the item at the given index.
    ///
    /// The contents are random, but fully determined by the workload seed and the index.
    pub fn payload(&self, index: u64) -> Bytes {
        let mut rng = SmallRng::seed_from_u64(self.seed ^ index);
        let mut contents = vec![0; self.payload_size as usize];
        rng.fill_bytes(&mut contents);
        contents.into()
    }

    /// The items of the sequence in index order, starting at 1.
    pub fn items(&self) -> impl Iterator<Item = SequenceItem> + '_ {
        (1..=self.iterations).map(|index| self.item(index))
    }

    /// The item at the given index, including its expected digest if verification is enabled.
    pub fn item(&self, index: u64) -> SequenceItem {
        let expected_digest = self
            .verify_digest
            .then(|| Digest::of(&self.payload(index)));

        SequenceItem {
            index,
            expected_size: self.payload_size,
            expected_digest,
        }
    }
}
