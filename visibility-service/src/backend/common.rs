use std::fmt::Debug;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

/// User agent string used for outgoing requests.
pub const USER_AGENT: &str = concat!("visibility-bench/", env!("CARGO_PKG_VERSION"));

/// Key used by [`Backend::probe`] to check that a backend is reachable.
///
/// The object does not need to exist, a successful "not found" answer is enough.
pub const PROBE_KEY: &str = ".visibility-probe";

/// Time limit for establishing a connection to a remote backend.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time limit for a single request to a remote backend, including the transfer of the body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A type-erased [`Backend`] instance.
pub type BoxedBackend = Box<dyn Backend>;

/// Acknowledgement that a write has been accepted by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteReceipt {
    /// The key the payload was written to.
    pub key: String,
    /// The number of bytes written.
    pub size: u64,
}

/// The narrow storage capability the harness measures through.
///
/// A missing object is reported as `Ok(None)` (or `Ok(false)` for deletes), never as an error.
/// Errors are reserved for faults of the backend itself.
#[async_trait::async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Stores the payload under the given key, replacing any previous object.
    async fn put_object(&self, key: &str, payload: Bytes) -> BackendResult<WriteReceipt>;

    /// Retrieves the full contents of the object at the given key.
    async fn get_object(&self, key: &str) -> BackendResult<Option<Bytes>>;

    /// Returns the size of the object at the given key without fetching it.
    async fn stat_object(&self, key: &str) -> BackendResult<Option<u64>>;

    /// Deletes the object at the given key, returning whether it existed.
    async fn delete_object(&self, key: &str) -> BackendResult<bool>;

    /// Checks that the backend can be reached at all.
    async fn probe(&self) -> BackendResult<()> {
        self.stat_object(PROBE_KEY).await.map(|_| ())
    }
}

/// Faults of a storage backend.
///
/// A missing object is not a fault and never produces one of these.
#[derive(Debug, Error)]
pub enum BackendError {
    /// IO errors related to file operations.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors stemming from the reqwest client, such as connection failures or timeouts.
    #[error("reqwest error: {context}")]
    Reqwest {
        context: String,
        #[source]
        cause: reqwest::Error,
    },

    /// The remote API answered with an unexpected status code.
    #[error("{context}: unexpected status {status}")]
    Status { context: String, status: StatusCode },

    /// The operation did not complete within its time limit.
    #[error("{context}: no answer within {timeout:?}")]
    Timeout { context: String, timeout: Duration },

    /// The remote API answered with a response that cannot be interpreted.
    #[error("{context}: {message}")]
    InvalidResponse { context: String, message: String },

    /// The backend could not be reached when it was set up.
    #[error("{backend} backend is unavailable")]
    Unavailable {
        backend: &'static str,
        #[source]
        cause: Box<BackendError>,
    },
}

impl BackendError {
    pub(crate) fn reqwest(context: impl Into<String>, cause: reqwest::Error) -> Self {
        Self::Reqwest {
            context: context.into(),
            cause,
        }
    }

    /// Creates a [`BackendError::Timeout`] for an operation that did not finish in time.
    pub fn timeout(context: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            context: context.into(),
            timeout,
        }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Creates a reqwest client with required defaults.
///
/// Requests are bounded by [`CONNECT_TIMEOUT`] and [`REQUEST_TIMEOUT`], so a silent endpoint
/// results in an error instead of a request that never returns.
pub fn reqwest_client() -> BackendResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|cause| BackendError::reqwest("failed to build http client", cause))
}
