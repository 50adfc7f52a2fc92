//! Runs producer and detector side by side in one process and reports the result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use visibility_service::Backend;
use yansi::Paint;

use crate::config::{Config, Output};
use crate::correlate::{Correlation, Misses};
use crate::detector::{Detector, DetectorConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::log::{RecordLog, read_log};
use crate::producer::{Producer, ProducerConfig};
use crate::records::{DetectionRecord, Outcome, WriteRecord, format_timestamp};
use crate::size::PayloadSize;
use crate::stats::{self, LatencyDistributionSummary, Ledger};
use crate::workload::Mode;

/// The result of a complete measurement.
#[derive(Debug)]
pub struct RunReport {
    /// Items written (or deleted) by the producer.
    pub produced: u64,
    /// Items the detector observed.
    pub found: u64,
    /// Quartiles of the latency, if any item was observed.
    pub summary: Option<LatencyDistributionSummary>,
}

/// The ledger label used when none is configured: payload size and start time.
pub fn default_label(config: &Config) -> String {
    let size = PayloadSize(config.workload().payload_size());
    format!("{size}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"))
}

/// The header line that starts the logs of a run.
pub fn log_header(config: &Config) -> String {
    let workload = config.workload();
    format!(
        "{} {} x {} started {}",
        config.run.mode,
        workload.iterations(),
        workload.payload_size(),
        format_timestamp(&Utc::now())
    )
}

/// Writes and detects all items concurrently, then summarizes the latencies.
///
/// The summary is appended to the ledger. If no item became visible, the run still completes, but
/// no ledger row is written.
pub async fn run(
    backend: Arc<dyn Backend>,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    let workload = config.workload();
    let mode = config.run.mode;
    let label = config
        .output
        .label
        .clone()
        .unwrap_or_else(|| default_label(config));

    println!(
        "{} {} (mode: {}, {} x {}, backend: {})",
        "## Run".bold(),
        label.as_str().bold().blue(),
        mode,
        workload.iterations().bold(),
        ByteSize::b(workload.payload_size()),
        backend.name()
    );

    if mode == Mode::Delete {
        prepare_deletes(Arc::clone(&backend), config, cancel).await?;
    }

    let header = log_header(config);
    let mut write_log = RecordLog::<WriteRecord>::open(&config.output.write_log, Some(&header))
        .await
        .context("failed to open write log")?;
    let mut detection_log =
        RecordLog::<DetectionRecord>::open(&config.output.detection_log, Some(&header))
            .await
            .context("failed to open detection log")?;

    let producer = Producer::new(
        Arc::clone(&backend),
        workload.clone(),
        config.producer_config(),
    );
    let detector = Detector::new(
        Arc::clone(&backend),
        workload.clone(),
        config.detector_config(),
    );

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message("Measuring visibility:");
    bar.enable_steady_tick(Duration::from_millis(100));

    // A failing producer stops the detector, which would only wait for items never written.
    let detector_cancel = cancel.child_token();
    let producer_task = tokio::spawn({
        let detector_cancel = detector_cancel.clone();
        let cancel = cancel.clone();
        async move {
            let result = producer.run(mode, &mut write_log, &cancel).await;
            if result.is_err() {
                detector_cancel.cancel();
            }
            result
        }
    });
    let detector_task =
        tokio::spawn(async move { detector.run(&mut detection_log, &detector_cancel).await });

    let (produced, found) = tokio::join!(producer_task, detector_task);
    bar.finish_and_clear();

    let produced = produced.context("producer task panicked")??;
    let found = found.context("detector task panicked")??;

    let summary = match summarize_logs(&config.output, &label) {
        Ok(summary) => {
            Ledger::new(&config.output.ledger).append(&summary)?;
            print_summary(&summary);
            Some(summary)
        }
        Err(HarnessError::EmptyInput) => {
            tracing::warn!("no item became visible, skipping ledger");
            println!("{}", "no item became visible".bold().red());
            None
        }
        Err(err) => return Err(err.into()),
    };

    if config.run.cleanup && mode == Mode::Write {
        cleanup(backend.as_ref(), config, produced).await?;
    }

    Ok(RunReport {
        produced,
        found,
        summary,
    })
}

/// Writes all items and waits until they are visible, so that their deletion can be measured.
async fn prepare_deletes(
    backend: Arc<dyn Backend>,
    config: &Config,
    cancel: &CancellationToken,
) -> HarnessResult<()> {
    let workload = config.workload();
    let producer = Producer::new(
        Arc::clone(&backend),
        workload.clone(),
        ProducerConfig {
            write_interval: Duration::ZERO,
            ..config.producer_config()
        },
    );
    let detector = Detector::new(
        backend,
        workload.clone(),
        DetectorConfig {
            mode: Mode::Write,
            ..config.detector_config()
        },
    );

    tracing::info!(iterations = workload.iterations(), "writing items to delete");
    for index in 1..=workload.iterations() {
        producer.produce(index, cancel).await?;
    }
    for item in workload.items() {
        let record = detector.detect(&item, cancel).await?;
        if record.outcome != Outcome::Found {
            tracing::warn!(
                index = item.index,
                outcome = %record.outcome,
                "item to delete not visible"
            );
        }
    }

    Ok(())
}

/// Correlates the write and detection logs of the last run and reduces them to quartiles.
///
/// If configured, the raw latency series is exported first.
pub fn summarize_logs(output: &Output, label: &str) -> HarnessResult<LatencyDistributionSummary> {
    let writes: Vec<WriteRecord> = read_log(&output.write_log)?;
    let detections: Vec<DetectionRecord> = read_log(&output.detection_log)?;
    let correlation = Correlation::new(&writes, &detections);

    if let Some(path) = &output.samples {
        stats::write_samples(path, correlation.samples())?;
    }

    let misses = correlation.misses();
    if misses.total() > 0 {
        tracing::warn!(
            timed_out = misses.timed_out,
            corrupted = misses.corrupted,
            unmatched = misses.unmatched,
            "some items did not yield a latency"
        );
    }

    let mut summary = stats::summarize(correlation.samples(), label)?;
    summary.misses = misses;
    Ok(summary)
}

/// Prints the quartiles of a summary to stdout.
pub fn print_summary(summary: &LatencyDistributionSummary) {
    let millis = |value: f64| Duration::from_secs_f64(value / 1000.0);

    print!(
        "{} ({} samples",
        "VISIBILITY:".bold().green(),
        summary.count.bold()
    );
    print_misses(&summary.misses);
    println!(")");
    println!(
        "  p0: {:.2?}; p25: {:.2?}; p50: {:.2?}; p75: {:.2?}; max: {:.2?}",
        millis(summary.p0),
        millis(summary.p25),
        millis(summary.p50).bold(),
        millis(summary.p75),
        millis(summary.max)
    );
}

fn print_misses(misses: &Misses) {
    if misses.timed_out > 0 {
        print!(", {}", format!("{} TIMED OUT", misses.timed_out).bold().red());
    }
    if misses.corrupted > 0 {
        print!(", {}", format!("{} CORRUPTED", misses.corrupted).bold().red());
    }
    if misses.unmatched > 0 {
        print!(", {} unmatched", misses.unmatched.yellow());
    }
}

/// Deletes the objects written by the run.
async fn cleanup(backend: &dyn Backend, config: &Config, produced: u64) -> Result<()> {
    let workload = config.workload();

    let bar = ProgressBar::new(produced)
        .with_message("Deleting written objects...")
        .with_style(ProgressStyle::with_template(
            "{msg}\n{wide_bar} {pos}/{len}",
        )?);
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut failures = 0;
    for index in 1..=produced {
        let key = workload.key(index);
        if let Err(err) = backend.delete_object(&key).await {
            tracing::warn!(error = &err as &dyn std::error::Error, %key, "failed to delete object");
            failures += 1;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    if failures > 0 {
        println!(
            "{}",
            format!("{failures} objects could not be deleted").bold().red()
        );
    }

    Ok(())
}
