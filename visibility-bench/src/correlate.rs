//! Joins write and detection records into latency samples.

use std::collections::HashMap;

use crate::records::{DetectionRecord, Outcome, WriteRecord};

/// The visibility latency of one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencySample {
    pub index: u64,
    /// Absolute time between the write and its detection.
    pub elapsed_millis: u64,
}

/// Detections that did not yield a latency sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Misses {
    pub timed_out: usize,
    pub corrupted: usize,
    /// Detections without a write record of the same index.
    pub unmatched: usize,
}

impl Misses {
    pub fn total(&self) -> usize {
        self.timed_out + self.corrupted + self.unmatched
    }
}

/// A join of a write log and a detection log by sequence index.
///
/// The correlation only borrows the records. Iterating [`samples`](Self::samples) repeatedly
/// yields the same sequence every time.
#[derive(Debug)]
pub struct Correlation<'a> {
    writes: HashMap<u64, &'a WriteRecord>,
    detections: &'a [DetectionRecord],
}

impl<'a> Correlation<'a> {
    pub fn new(writes: &'a [WriteRecord], detections: &'a [DetectionRecord]) -> Self {
        let writes = writes.iter().map(|write| (write.index, write)).collect();
        Self { writes, detections }
    }

    /// Latency samples in the order of the detection log.
    ///
    /// Timestamps come from two clocks that may disagree, so the difference is taken as an
    /// absolute value.
    pub fn samples(&self) -> impl Iterator<Item = LatencySample> + '_ {
        self.detections
            .iter()
            .filter(|detection| detection.outcome == Outcome::Found)
            .filter_map(|detection| {
                let write = self.writes.get(&detection.index)?;
                let delta = detection.detect_timestamp - write.write_timestamp;
                Some(LatencySample {
                    index: detection.index,
                    elapsed_millis: delta.num_milliseconds().unsigned_abs(),
                })
            })
    }

    /// Counts the detections that [`samples`](Self::samples) skips.
    pub fn misses(&self) -> Misses {
        let mut misses = Misses::default();
        for detection in self.detections {
            match detection.outcome {
                Outcome::TimedOut => misses.timed_out += 1,
                Outcome::Corrupted => misses.corrupted += 1,
                Outcome::Found if !self.writes.contains_key(&detection.index) => {
                    misses.unmatched += 1
                }
                Outcome::Found => (),
            }
        }
        misses
    }
}
