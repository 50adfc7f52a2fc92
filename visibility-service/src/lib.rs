//! The storage adapter layer of the visibility harness.
//!
//! Every backend implements the narrow [`Backend`] capability: `put`, `get`, `stat` and `delete`
//! of whole objects addressed by a string key. The harness only ever talks to storage through
//! this trait, so credentials and connection setup remain a concern of the individual backend.
//!
//! Use [`connect`] to construct a backend from a [`StorageConfig`]. It checks that the backend is
//! reachable before handing it out, since no measurement is possible against an unavailable
//! store.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod backend;

use std::path::Path;
use std::time::Duration;

pub use backend::{
    AzureBlob, Backend, BackendError, BackendResult, BoxedBackend, CONNECT_TIMEOUT,
    InMemoryBackend, LocalFs, PROBE_KEY, Propagation, REQUEST_TIMEOUT, S3Compatible, USER_AGENT,
    WriteReceipt,
};

/// Time limit for the reachability check performed by [`connect`].
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration to initialize a [`Backend`] via [`connect`].
#[derive(Debug)]
pub enum StorageConfig<'a> {
    /// Use a local filesystem, or a network filesystem mounted locally.
    FileSystem {
        /// The path to the directory where files will be stored.
        path: &'a Path,
    },
    /// Use an S3-compatible object store.
    S3Compatible {
        /// Endpoint URL of the store.
        endpoint: &'a str,
        /// The name of the bucket to use.
        bucket: &'a str,
        /// Optional bearer token.
        token: Option<&'a str>,
    },
    /// Use an Azure-compatible blob container.
    Azure {
        /// The blob service URL of the storage account.
        account_url: &'a str,
        /// The name of the container to use.
        container: &'a str,
        /// Optional shared access signature.
        sas_token: Option<&'a str>,
    },
    /// Use an in-process store with the given propagation behavior.
    Memory {
        /// How writes and deletes propagate to readers.
        propagation: Propagation,
    },
}

/// Creates the configured backend and checks that it can be reached.
///
/// Fails with [`BackendError::Unavailable`] if the backend does not answer its probe within
/// [`PROBE_TIMEOUT`].
pub async fn connect(config: StorageConfig<'_>) -> BackendResult<BoxedBackend> {
    let backend: BoxedBackend = match config {
        StorageConfig::FileSystem { path } => Box::new(LocalFs::new(path)),
        StorageConfig::S3Compatible {
            endpoint,
            bucket,
            token,
        } => Box::new(S3Compatible::new(endpoint, bucket, token.map(Into::into))?),
        StorageConfig::Azure {
            account_url,
            container,
            sas_token,
        } => Box::new(AzureBlob::new(
            account_url,
            container,
            sas_token.map(Into::into),
        )?),
        StorageConfig::Memory { propagation } => {
            Box::new(InMemoryBackend::new().with_default_propagation(propagation))
        }
    };

    ensure_reachable(backend.as_ref(), PROBE_TIMEOUT).await?;
    Ok(backend)
}

/// Probes the backend, failing with [`BackendError::Unavailable`] if the probe fails or does not
/// complete within `timeout`.
pub async fn ensure_reachable(backend: &dyn Backend, timeout: Duration) -> BackendResult<()> {
    let cause = match tokio::time::timeout(timeout, backend.probe()).await {
        Ok(Ok(())) => {
            tracing::debug!(backend = backend.name(), "storage backend is reachable");
            return Ok(());
        }
        Ok(Err(cause)) => cause,
        Err(_elapsed) => BackendError::timeout("probe", timeout),
    };

    Err(BackendError::Unavailable {
        backend: backend.name(),
        cause: Box::new(cause),
    })
}
