//! In-memory backend for tests and dry runs.
//!
//! This provides a [`Backend`] backed by a `HashMap`, removing the need for filesystem tempdir
//! management in tests. The backend is [`Clone`] so tests can hold a handle for configuring
//! propagation behavior while the harness owns another copy.
//!
//! Unlike a real store, the backend can simulate the effects the harness is built to measure:
//! writes and deletes that only become visible after a delay, objects that are exposed at their
//! final size with torn contents, objects that are never visible at all, transient faults, and a
//! store that stops answering altogether.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use super::common::{Backend, BackendError, BackendResult, WriteReceipt};

/// How a change to an object propagates to readers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Time after a write or delete before readers observe it.
    pub delay: Duration,
    /// Time after becoming visible during which readers see the final size with torn contents.
    pub torn_for: Duration,
    /// Whether writes never become visible.
    pub lost: bool,
}

impl Propagation {
    /// Changes are visible immediately.
    pub const IMMEDIATE: Self = Self {
        delay: Duration::ZERO,
        torn_for: Duration::ZERO,
        lost: false,
    };

    /// Changes become visible after the given delay.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::IMMEDIATE
        }
    }

    /// Objects are visible immediately, but with torn contents for the given duration.
    pub fn torn(torn_for: Duration) -> Self {
        Self {
            torn_for,
            ..Self::IMMEDIATE
        }
    }

    /// Written objects never become visible.
    pub fn lost() -> Self {
        Self {
            lost: true,
            ..Self::IMMEDIATE
        }
    }
}

#[derive(Debug)]
struct Entry {
    bytes: Bytes,
    written_at: Instant,
    deleted_at: Option<Instant>,
    propagation: Propagation,
}

impl Entry {
    /// The contents a reader observes at the given instant.
    fn view(&self, now: Instant) -> Option<Bytes> {
        let Propagation {
            delay,
            torn_for,
            lost,
        } = self.propagation;

        if lost {
            return None;
        }
        if let Some(deleted_at) = self.deleted_at
            && now >= deleted_at + delay
        {
            return None;
        }

        let visible_at = self.written_at + delay;
        if now < visible_at {
            return None;
        }
        if now < visible_at + torn_for {
            return Some(self.bytes.iter().map(|byte| !byte).collect());
        }
        Some(self.bytes.clone())
    }
}

#[derive(Debug, Default)]
struct Store {
    objects: HashMap<String, Entry>,
    rules: HashMap<String, Propagation>,
    default_propagation: Propagation,
    read_faults: u32,
    write_faults: u32,
    unresponsive: bool,
}

impl Store {
    fn propagation(&self, key: &str) -> Propagation {
        self.rules
            .get(key)
            .copied()
            .unwrap_or(self.default_propagation)
    }

    fn take_fault(counter: &mut u32, operation: &str) -> BackendResult<()> {
        if *counter == 0 {
            return Ok(());
        }
        *counter -= 1;
        Err(BackendError::Io(std::io::Error::other(format!(
            "injected {operation} fault"
        ))))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A panic while holding the lock leaves the map itself intact.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the propagation behavior for all keys without a specific rule.
    pub fn with_default_propagation(self, propagation: Propagation) -> Self {
        self.lock().default_propagation = propagation;
        self
    }

    /// Sets the propagation behavior for a single key.
    ///
    /// The rule applies to subsequent writes and deletes of that key.
    pub fn set_propagation(&self, key: impl Into<String>, propagation: Propagation) {
        self.lock().rules.insert(key.into(), propagation);
    }

    /// Makes the next `count` reads (`get`, `stat`) fail with an I/O error.
    pub fn inject_read_faults(&self, count: u32) {
        self.lock().read_faults = count;
    }

    /// Makes the next `count` writes fail with an I/O error.
    pub fn inject_write_faults(&self, count: u32) {
        self.lock().write_faults = count;
    }

    /// Makes all operations, including the probe, stall without ever completing.
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.lock().unresponsive = unresponsive;
    }

    async fn stall_if_unresponsive(&self) {
        let unresponsive = self.lock().unresponsive;
        if unresponsive {
            std::future::pending::<()>().await;
        }
    }

    /// Returns the stored contents, bypassing propagation.
    pub fn get_stored(&self, key: &str) -> Option<Bytes> {
        self.lock()
            .objects
            .get(key)
            .filter(|entry| entry.deleted_at.is_none())
            .map(|entry| entry.bytes.clone())
    }

    /// Returns `true` if the backend has no stored objects.
    pub fn is_empty(&self) -> bool {
        self.lock()
            .objects
            .values()
            .all(|entry| entry.deleted_at.is_some())
    }
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put_object(&self, key: &str, payload: Bytes) -> BackendResult<WriteReceipt> {
        self.stall_if_unresponsive().await;
        let mut store = self.lock();
        Store::take_fault(&mut store.write_faults, "write")?;

        let size = payload.len() as u64;
        let propagation = store.propagation(key);
        store.objects.insert(
            key.to_owned(),
            Entry {
                bytes: payload,
                written_at: Instant::now(),
                deleted_at: None,
                propagation,
            },
        );

        Ok(WriteReceipt {
            key: key.to_owned(),
            size,
        })
    }

    async fn get_object(&self, key: &str) -> BackendResult<Option<Bytes>> {
        self.stall_if_unresponsive().await;
        let mut store = self.lock();
        Store::take_fault(&mut store.read_faults, "read")?;

        let now = Instant::now();
        Ok(store.objects.get(key).and_then(|entry| entry.view(now)))
    }

    async fn stat_object(&self, key: &str) -> BackendResult<Option<u64>> {
        self.stall_if_unresponsive().await;
        let mut store = self.lock();
        Store::take_fault(&mut store.read_faults, "read")?;

        let now = Instant::now();
        Ok(store
            .objects
            .get(key)
            .and_then(|entry| entry.view(now))
            .map(|bytes| bytes.len() as u64))
    }

    async fn delete_object(&self, key: &str) -> BackendResult<bool> {
        self.stall_if_unresponsive().await;
        let mut store = self.lock();
        Store::take_fault(&mut store.write_faults, "write")?;

        let propagation = store.propagation(key);
        match store.objects.get_mut(key) {
            Some(entry) if entry.deleted_at.is_none() => {
                entry.deleted_at = Some(Instant::now());
                entry.propagation.delay = propagation.delay;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn probe(&self) -> BackendResult<()> {
        self.stall_if_unresponsive().await;
        Ok(())
    }
}
