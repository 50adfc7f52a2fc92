//! The detector side of a measurement: polls for every item of a [`Workload`] until it is visible.
//!
//! For each item, the detector performs a `stat` at a fixed interval until the object reports the
//! expected size. If the workload verifies contents, the object is then fetched in full and its
//! digest is compared to the expected payload digest. An object with the right size but the wrong
//! contents is a torn write in progress and polling simply continues.
//!
//! Polling for an item ends once the item is found, or once the wait budget is spent. Running out
//! of time is not an error: the item is recorded as [`Outcome::TimedOut`], or
//! [`Outcome::Corrupted`] if the last observation was torn.
//!
//! Backend faults are classified by the [`FaultPolicy`]. They either count as a missed poll, or
//! abort the detector.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use visibility_service::{Backend, BackendError};

use crate::checksum::Digest;
use crate::error::{HarnessError, HarnessResult};
use crate::log::RecordLog;
use crate::records::{DetectionRecord, Outcome};
use crate::utils::{scheduled_at, sleep_or_cancel};
use crate::workload::{Mode, SequenceItem, Workload};

/// How the detector treats errors returned by the backend while polling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Log the error, count the poll as a miss and keep polling.
    #[default]
    Transient,
    /// Abort the detector with the error.
    Fatal,
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultPolicy::Transient => f.write_str("transient"),
            FaultPolicy::Fatal => f.write_str("fatal"),
        }
    }
}

impl FromStr for FaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("transient") => Ok(FaultPolicy::Transient),
            s if s.eq_ignore_ascii_case("fatal") => Ok(FaultPolicy::Fatal),
            s => Err(format!(
                r#"invalid fault policy "{s}": expected one of "transient", "fatal""#
            )),
        }
    }
}

/// Settings for the detector.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Fixed delay between polls of the same item.
    pub poll_interval: Duration,
    /// Time after which polling for an item is given up.
    ///
    /// The budget of an item starts no earlier than the moment its write is due according to
    /// `write_interval`, so items that have not been written yet do not time out.
    pub max_wait: Duration,
    /// The cadence at which the producer writes the items.
    pub write_interval: Duration,
    pub fault_policy: FaultPolicy,
    pub mode: Mode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            write_interval: Duration::ZERO,
            fault_policy: FaultPolicy::default(),
            mode: Mode::default(),
        }
    }
}

/// What a single poll saw.
#[derive(Debug)]
enum Observation {
    /// The change is visible.
    Visible { size: u64, digest: Option<Digest> },
    /// Nothing to report yet: the object is absent, or in delete mode still present.
    Missing { size: u64 },
    /// The object has the expected size, but its contents do not match.
    Torn { size: u64, digest: Digest },
}

/// Polls storage for the items of a workload and records when each became visible.
#[derive(Debug)]
pub struct Detector {
    backend: Arc<dyn Backend>,
    workload: Workload,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(backend: Arc<dyn Backend>, workload: Workload, config: DetectorConfig) -> Self {
        Self {
            backend,
            workload,
            config,
        }
    }

    /// Polls for a single item until it is visible or the wait budget is spent.
    ///
    /// The returned record is timestamped the moment the item was observed, or when the detector
    /// gave up. Polling never extends beyond `max_wait + poll_interval`, even if the backend hangs.
    pub async fn detect(
        &self,
        item: &SequenceItem,
        cancel: &CancellationToken,
    ) -> HarnessResult<DetectionRecord> {
        self.detect_since(item, Instant::now(), cancel).await
    }

    /// Polls for a single item, starting the wait budget at `budget_start`.
    ///
    /// Polling begins right away, even if `budget_start` lies in the future.
    async fn detect_since(
        &self,
        item: &SequenceItem,
        budget_start: Instant,
        cancel: &CancellationToken,
    ) -> HarnessResult<DetectionRecord> {
        let key = self.workload.key(item.index);
        let DetectorConfig {
            poll_interval,
            max_wait,
            ..
        } = self.config;

        let give_up_at = budget_start + max_wait;
        let hard_deadline = give_up_at + poll_interval;

        let mut attempts = 0;
        let mut last_size = 0;
        let mut torn_digest = None;

        loop {
            attempts += 1;

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
                result = tokio::time::timeout_at(hard_deadline, self.observe(&key, item)) => result,
            };

            match result {
                Ok(Ok(Observation::Visible { size, digest })) => {
                    tracing::debug!(%key, attempts, "item visible");
                    return Ok(DetectionRecord {
                        index: item.index,
                        detect_timestamp: Utc::now(),
                        observed_size: size,
                        observed_digest: digest,
                        attempts,
                        outcome: Outcome::Found,
                    });
                }
                Ok(Ok(Observation::Missing { size })) => {
                    last_size = size;
                    torn_digest = None;
                }
                Ok(Ok(Observation::Torn { size, digest })) => {
                    tracing::debug!(%key, attempts, "contents do not match yet");
                    last_size = size;
                    torn_digest = Some(digest);
                }
                Ok(Err(err)) => match self.config.fault_policy {
                    FaultPolicy::Fatal => return Err(err.into()),
                    FaultPolicy::Transient => {
                        tracing::warn!(
                            error = &err as &dyn std::error::Error,
                            %key,
                            attempts,
                            "poll failed"
                        );
                        torn_digest = None;
                    }
                },
                Err(_elapsed) => {
                    tracing::warn!(%key, attempts, "poll did not complete in time");
                    torn_digest = None;
                }
            }

            let now = Instant::now();
            if now >= give_up_at {
                let outcome = match torn_digest {
                    Some(_) => Outcome::Corrupted,
                    None => Outcome::TimedOut,
                };
                tracing::debug!(%key, attempts, %outcome, "giving up");
                return Ok(DetectionRecord {
                    index: item.index,
                    detect_timestamp: Utc::now(),
                    observed_size: last_size,
                    observed_digest: torn_digest,
                    attempts,
                    outcome,
                });
            }

            // The last poll happens right at the end of the budget.
            sleep_or_cancel(poll_interval.min(give_up_at - now), cancel).await?;
        }
    }

    async fn observe(&self, key: &str, item: &SequenceItem) -> Result<Observation, BackendError> {
        let size = self.backend.stat_object(key).await?;

        if self.config.mode == Mode::Delete {
            return Ok(match size {
                None => Observation::Visible {
                    size: 0,
                    digest: None,
                },
                Some(size) => Observation::Missing { size },
            });
        }

        let size = match size {
            Some(size) if size == item.expected_size => size,
            Some(size) => return Ok(Observation::Missing { size }),
            None => return Ok(Observation::Missing { size: 0 }),
        };

        let Some(expected) = item.expected_digest else {
            return Ok(Observation::Visible { size, digest: None });
        };

        // The object may have changed between `stat` and `get`, so check the size again.
        let Some(contents) = self.backend.get_object(key).await? else {
            return Ok(Observation::Missing { size: 0 });
        };
        let size = contents.len() as u64;
        if size != item.expected_size {
            return Ok(Observation::Missing { size });
        }

        let digest = Digest::of(&contents);
        if digest == expected {
            Ok(Observation::Visible {
                size,
                digest: Some(digest),
            })
        } else {
            Ok(Observation::Torn { size, digest })
        }
    }

    /// Polls for all items in index order and appends one record per item to the log.
    ///
    /// Returns the number of items found.
    pub async fn run(
        &self,
        log: &mut RecordLog<DetectionRecord>,
        cancel: &CancellationToken,
    ) -> HarnessResult<u64> {
        let iterations = self.workload.iterations();
        tracing::info!(
            mode = %self.config.mode,
            iterations,
            poll_interval = ?self.config.poll_interval,
            max_wait = ?self.config.max_wait,
            write_interval = ?self.config.write_interval,
            "starting detector"
        );

        let started = Instant::now();
        let mut found = 0;
        for item in self.workload.items() {
            if item.index % 10 == 0 {
                tracing::info!("processed {} of {iterations} items", item.index);
            }

            let due = scheduled_at(started, self.config.write_interval, item.index);
            let record = self
                .detect_since(&item, due.max(Instant::now()), cancel)
                .await?;
            match record.outcome {
                Outcome::Found => found += 1,
                outcome => tracing::warn!(index = item.index, %outcome, "item not visible"),
            }
            log.append(&record).await?;
        }

        tracing::info!(found, missed = iterations - found, "detector finished");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use visibility_service::{InMemoryBackend, Propagation};

    use super::*;

    const POLL: Duration = Duration::from_millis(100);
    const MAX_WAIT: Duration = Duration::from_secs(5);

    fn workload() -> Workload {
        Workload::builder("obj")
            .iterations(3)
            .payload_size(256)
            .build()
    }

    fn detector(backend: &InMemoryBackend, config: DetectorConfig) -> Detector {
        Detector::new(Arc::new(backend.clone()), workload(), config)
    }

    async fn write(backend: &InMemoryBackend, index: u64) {
        let workload = workload();
        backend
            .put_object(&workload.key(index), workload.payload(index))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_visibility_within_one_poll() {
        let backend = InMemoryBackend::new();
        write(&backend, 1).await;
        let detector = detector(&backend, DetectorConfig::default());

        let start = Instant::now();
        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.outcome, Outcome::Found);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.observed_size, 256);
        assert!(start.elapsed() <= POLL);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_write_is_found() {
        let backend = InMemoryBackend::new();
        backend.set_propagation("obj000001", Propagation::delayed(Duration::from_secs(2)));
        write(&backend, 1).await;
        let detector = detector(&backend, DetectorConfig::default());

        let start = Instant::now();
        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.outcome, Outcome::Found);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed <= Duration::from_secs(2) + POLL);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_write_times_out() {
        let backend = InMemoryBackend::new().with_default_propagation(Propagation::lost());
        write(&backend, 1).await;
        let detector = detector(&backend, DetectorConfig::default());

        let start = Instant::now();
        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.outcome, Outcome::TimedOut);
        assert_eq!(record.observed_size, 0);
        let elapsed = start.elapsed();
        assert!(elapsed >= MAX_WAIT);
        assert!(elapsed <= MAX_WAIT + POLL);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_cannot_stall_polling() {
        let backend = InMemoryBackend::new();
        write(&backend, 1).await;
        backend.set_unresponsive(true);
        let detector = detector(&backend, DetectorConfig::default());

        let start = Instant::now();
        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.outcome, Outcome::TimedOut);
        assert_eq!(record.attempts, 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= MAX_WAIT);
        assert!(elapsed <= MAX_WAIT + POLL);
    }

    #[tokio::test(start_paused = true)]
    async fn torn_contents_are_not_found() {
        let backend = InMemoryBackend::new();
        backend.set_propagation("obj000001", Propagation::torn(Duration::from_millis(350)));
        write(&backend, 1).await;
        let detector = detector(&backend, DetectorConfig::default());

        let start = Instant::now();
        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.outcome, Outcome::Found);
        assert!(start.elapsed() >= Duration::from_millis(350));
        assert_eq!(
            record.observed_digest,
            Some(Digest::of(&workload().payload(1)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn torn_until_timeout_is_corrupted() {
        let backend = InMemoryBackend::new();
        backend.set_propagation("obj000001", Propagation::torn(Duration::from_secs(60)));
        write(&backend, 1).await;
        let detector = detector(&backend, DetectorConfig::default());

        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.outcome, Outcome::Corrupted);
        assert_eq!(record.observed_size, 256);
    }

    #[tokio::test(start_paused = true)]
    async fn size_only_without_digest() {
        let backend = InMemoryBackend::new();
        backend.set_propagation("obj000001", Propagation::torn(Duration::from_secs(60)));
        write(&backend, 1).await;

        let workload = Workload::builder("obj")
            .payload_size(256)
            .verify_digest(false)
            .build();
        let detector = Detector::new(
            Arc::new(backend.clone()),
            workload.clone(),
            DetectorConfig::default(),
        );

        let record = detector
            .detect(&workload.item(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.outcome, Outcome::Found);
        assert_eq!(record.observed_digest, None);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_size_keeps_polling() {
        let backend = InMemoryBackend::new();
        backend
            .put_object("obj000001", Bytes::from_static(b"partial"))
            .await
            .unwrap();
        let detector = detector(
            &backend,
            DetectorConfig {
                max_wait: Duration::from_secs(1),
                ..Default::default()
            },
        );

        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.outcome, Outcome::TimedOut);
        assert_eq!(record.observed_size, 7);
        assert!(record.attempts > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_faults_are_misses() {
        let backend = InMemoryBackend::new();
        write(&backend, 1).await;
        backend.inject_read_faults(2);
        let detector = detector(&backend, DetectorConfig::default());

        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.outcome, Outcome::Found);
        assert_eq!(record.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_faults_abort() {
        let backend = InMemoryBackend::new();
        write(&backend, 1).await;
        backend.inject_read_faults(1);
        let detector = detector(
            &backend,
            DetectorConfig {
                fault_policy: FaultPolicy::Fatal,
                ..Default::default()
            },
        );

        let err = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Backend(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_visible_once_absent() {
        let backend = InMemoryBackend::new()
            .with_default_propagation(Propagation::delayed(Duration::from_millis(500)));
        write(&backend, 1).await;
        tokio::time::advance(Duration::from_millis(500)).await;
        backend.delete_object("obj000001").await.unwrap();

        let detector = detector(
            &backend,
            DetectorConfig {
                mode: Mode::Delete,
                ..Default::default()
            },
        );

        let start = Instant::now();
        let record = detector
            .detect(&workload().item(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.outcome, Outcome::Found);
        assert_eq!(record.observed_size, 0);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_item() {
        let backend = InMemoryBackend::new();
        let detector = detector(&backend, DetectorConfig::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            trigger.cancel();
        });

        let err = detector
            .detect(&workload().item(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn run_records_all_items() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("detections.tsv");

        let backend = InMemoryBackend::new();
        write(&backend, 1).await;
        write(&backend, 3).await;
        let detector = detector(
            &backend,
            DetectorConfig {
                max_wait: Duration::from_millis(300),
                ..Default::default()
            },
        );

        let mut log = RecordLog::open(&path, None).await.unwrap();
        let found = detector
            .run(&mut log, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found, 2);

        let records: Vec<DetectionRecord> = crate::log::read_log(&path).unwrap();
        let outcomes: Vec<_> = records.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            [Outcome::Found, Outcome::TimedOut, Outcome::Found]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn budget_follows_write_cadence() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("detections.tsv");

        let backend = InMemoryBackend::new();
        let detector = detector(
            &backend,
            DetectorConfig {
                max_wait: Duration::from_secs(1),
                write_interval: Duration::from_secs(2),
                ..Default::default()
            },
        );

        let writer = backend.clone();
        tokio::spawn(async move {
            for index in 1..=3 {
                write(&writer, index).await;
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        });

        let mut log = RecordLog::open(&path, None).await.unwrap();
        let found = detector
            .run(&mut log, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found, 3);
    }

    #[test]
    fn parses_fault_policy() {
        assert_eq!("Fatal".parse(), Ok(FaultPolicy::Fatal));
        assert_eq!("transient".parse(), Ok(FaultPolicy::Transient));
        assert!("ignore".parse::<FaultPolicy>().is_err());
    }
}
