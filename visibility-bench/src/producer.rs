//! The producer side of a measurement: writes (or deletes) every item of a [`Workload`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use visibility_service::{Backend, BackendError};

use crate::checksum::Digest;
use crate::error::{HarnessError, HarnessResult};
use crate::log::RecordLog;
use crate::records::WriteRecord;
use crate::utils::{scheduled_at, sleep_or_cancel, sleep_until_or_cancel};
use crate::workload::{Mode, Workload};

/// Settings for the producer.
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Fixed cadence of successive items.
    ///
    /// Item `k` is started `(k - 1) * write_interval` after the first one. An item that runs late
    /// does not shift the items after it.
    pub write_interval: Duration,
    /// Additional attempts after a failed write before giving up.
    pub write_retries: u32,
    /// Fixed delay between attempts of the same item.
    pub retry_delay: Duration,
    /// Time limit for a single attempt. An attempt that exceeds it counts as failed.
    pub write_timeout: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            write_interval: Duration::ZERO,
            write_retries: 3,
            retry_delay: Duration::from_millis(500),
            write_timeout: Duration::from_secs(30),
        }
    }
}

/// Writes the items of a workload and records when each write completed.
#[derive(Debug)]
pub struct Producer {
    backend: Arc<dyn Backend>,
    workload: Workload,
    config: ProducerConfig,
}

impl Producer {
    pub fn new(backend: Arc<dyn Backend>, workload: Workload, config: ProducerConfig) -> Self {
        Self {
            backend,
            workload,
            config,
        }
    }

    /// Writes the payload of the item at `index`.
    ///
    /// Failed writes are retried a fixed number of times. The returned record is timestamped the
    /// moment the backend acknowledged the write.
    pub async fn produce(
        &self,
        index: u64,
        cancel: &CancellationToken,
    ) -> HarnessResult<WriteRecord> {
        let key = self.workload.key(index);
        let payload = self.workload.payload(index);
        let digest = Digest::of(&payload);

        let receipt = self
            .with_retries(index, cancel, || {
                self.backend.put_object(&key, Bytes::clone(&payload))
            })
            .await?;
        let write_timestamp = Utc::now();
        tracing::trace!(key = %receipt.key, size = receipt.size, "write acknowledged");

        Ok(WriteRecord {
            index,
            write_timestamp,
            digest,
            size_bytes: receipt.size,
        })
    }

    /// Deletes the item at `index`.
    ///
    /// The record describes the now empty object: size zero and the digest of no contents.
    pub async fn delete(
        &self,
        index: u64,
        cancel: &CancellationToken,
    ) -> HarnessResult<WriteRecord> {
        let key = self.workload.key(index);
        let existed = self
            .with_retries(index, cancel, || self.backend.delete_object(&key))
            .await?;
        if !existed {
            tracing::warn!(%key, "deleted object did not exist");
        }

        Ok(WriteRecord {
            index,
            write_timestamp: Utc::now(),
            digest: Digest::of(b""),
            size_bytes: 0,
        })
    }

    /// Runs through all items in index order and appends one record per item to the log.
    ///
    /// Returns the number of items completed. Stops early with [`HarnessError::Cancelled`] when
    /// the token is cancelled; records appended until then remain valid.
    pub async fn run(
        &self,
        mode: Mode,
        log: &mut RecordLog<WriteRecord>,
        cancel: &CancellationToken,
    ) -> HarnessResult<u64> {
        let iterations = self.workload.iterations();
        tracing::info!(%mode, iterations, "starting producer");

        let started = Instant::now();
        for index in 1..=iterations {
            let due = scheduled_at(started, self.config.write_interval, index);
            sleep_until_or_cancel(due, cancel).await?;
            if index % 10 == 0 {
                tracing::info!("processed {index} of {iterations} items");
            }

            let record = match mode {
                Mode::Write => self.produce(index, cancel).await?,
                Mode::Delete => self.delete(index, cancel).await?,
            };
            tracing::debug!(index, size = record.size_bytes, "item completed");
            log.append(&record).await?;
        }

        Ok(iterations)
    }

    async fn with_retries<T, F, Fut>(
        &self,
        index: u64,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> HarnessResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let attempts = self.config.write_retries + 1;
        let write_timeout = self.config.write_timeout;
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
                result = tokio::time::timeout(write_timeout, operation()) => match result {
                    Ok(result) => result,
                    Err(_elapsed) => Err(BackendError::timeout("write", write_timeout)),
                },
            };

            match result {
                Ok(value) => return Ok(value),
                Err(source) if attempt >= attempts => {
                    return Err(HarnessError::WriteFailed {
                        index,
                        attempts,
                        source,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        error = &err as &dyn std::error::Error,
                        index,
                        attempt,
                        "write failed, retrying"
                    );
                    attempt += 1;
                    sleep_or_cancel(self.config.retry_delay, cancel).await?;
                }
            }
        }
    }
}
