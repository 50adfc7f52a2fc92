//! A harness that measures how long changes to a storage backend take to become visible.
//!
//! A [`Producer`](producer::Producer) writes a numbered sequence of objects and logs when each
//! write completed. A [`Detector`](detector::Detector), possibly on another host, polls the same
//! backend until each object is visible with its complete contents and logs when it saw it. The
//! two logs are then joined by sequence index into latency samples, which are reduced to quartiles
//! and appended to a ledger of runs.
//!
//! Producer and detector share nothing but the storage backend and the [`Workload`]: the key
//! naming convention, the number of items, the payload size and the seed that payload contents
//! are derived from.
#![warn(missing_debug_implementations)]

pub mod checksum;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod detector;
pub mod error;
pub mod harness;
pub mod log;
pub mod observability;
pub mod producer;
pub mod records;
pub mod size;
pub mod stats;
pub mod utils;
pub mod workload;

pub use crate::error::{HarnessError, HarnessResult};
pub use crate::harness::run;
pub use crate::workload::Workload;
