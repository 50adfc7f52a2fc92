//! Latency distribution summaries and the run ledger.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::correlate::{LatencySample, Misses};
use crate::error::{HarnessError, HarnessResult};

/// Computes the `p`-th percentile of sorted values, interpolating between neighbors.
///
/// The rank of the percentile is `p / 100 * (n - 1)`. Returns `NaN` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!((0.0..=100.0).contains(&p), "percentile out of range: {p}");

    let Some(&last) = sorted.last() else {
        return f64::NAN;
    };
    if sorted.len() == 1 {
        return last;
    }

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Quartiles of the visibility latency of one run, in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct LatencyDistributionSummary {
    pub label: String,
    pub p0: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p100: f64,
    pub max: f64,
    /// The number of samples the quartiles were computed from.
    pub count: usize,
    pub misses: Misses,
}

impl LatencyDistributionSummary {
    /// Formats the summary as a ledger row, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.label, self.p0, self.p25, self.p50, self.p75, self.max
        )
    }
}

/// Reduces latency samples to their quartiles.
///
/// Fails with [`HarnessError::EmptyInput`] if there are no samples.
pub fn summarize(
    samples: impl IntoIterator<Item = LatencySample>,
    label: &str,
) -> HarnessResult<LatencyDistributionSummary> {
    let mut values: Vec<f64> = samples
        .into_iter()
        .map(|sample| sample.elapsed_millis as f64)
        .collect();
    if values.is_empty() {
        return Err(HarnessError::EmptyInput);
    }
    values.sort_by(f64::total_cmp);

    let max = values[values.len() - 1];
    Ok(LatencyDistributionSummary {
        label: label.to_owned(),
        p0: percentile(&values, 0.0),
        p25: percentile(&values, 25.0),
        p50: percentile(&values, 50.0),
        p75: percentile(&values, 75.0),
        p100: percentile(&values, 100.0),
        max,
        count: values.len(),
        misses: Misses::default(),
    })
}

/// A file that collects one summary row per run.
///
/// Rows are only ever appended, so the ledger accumulates the history of all runs.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the summary as a single row.
    pub fn append(&self, summary: &LatencyDistributionSummary) -> HarnessResult<()> {
        let line = format!("{}\n", summary.to_line());
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|err| HarnessError::log(&self.path, err))
    }
}

/// Writes the raw latency series as `index<TAB>elapsed` lines, replacing the file.
pub fn write_samples(
    path: &Path,
    samples: impl IntoIterator<Item = LatencySample>,
) -> HarnessResult<()> {
    let mut contents = String::new();
    for sample in samples {
        contents.push_str(&format!("{}\t{}\n", sample.index, sample.elapsed_millis));
    }
    std::fs::write(path, contents).map_err(|err| HarnessError::log(path, err))
}
