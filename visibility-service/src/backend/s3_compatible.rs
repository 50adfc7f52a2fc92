use std::fmt;

use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{RequestBuilder, Response, StatusCode};

use super::common::{Backend, BackendError, BackendResult, WriteReceipt, reqwest_client};

/// An object store speaking the path-style S3 REST dialect.
///
/// Requests are addressed as `{endpoint}/{bucket}/{key}`. When a token is configured, it is sent
/// as a bearer token, which covers MinIO deployments with token auth as well as the GCS XML API.
/// Buckets with anonymous read/write policies work without a token.
pub struct S3Compatible {
    client: reqwest::Client,

    endpoint: String,
    bucket: String,

    token: Option<String>,
}

impl S3Compatible {
    pub fn new(endpoint: &str, bucket: &str, token: Option<String>) -> BackendResult<Self> {
        Ok(Self {
            client: reqwest_client()?,
            endpoint: endpoint.trim_end_matches('/').into(),
            bucket: bucket.into(),
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.endpoint, self.bucket)
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> BackendResult<Response> {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        builder
            .send()
            .await
            .map_err(|cause| BackendError::reqwest(context, cause))
    }
}

impl fmt::Debug for S3Compatible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Compatible")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Backend for S3Compatible {
    fn name(&self) -> &'static str {
        "s3-compatible"
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn put_object(&self, key: &str, payload: Bytes) -> BackendResult<WriteReceipt> {
        tracing::debug!("Writing to s3_compatible backend");
        let size = payload.len() as u64;
        let builder = self.client.put(self.object_url(key)).body(payload);
        let response = self.send(builder, "failed to put object").await?;
        check_status(response.status(), "failed to put object")?;

        Ok(WriteReceipt {
            key: key.to_owned(),
            size,
        })
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn get_object(&self, key: &str) -> BackendResult<Option<Bytes>> {
        tracing::debug!("Reading from s3_compatible backend");
        let builder = self.client.get(self.object_url(key));
        let response = self.send(builder, "failed to get object").await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Object not found");
            return Ok(None);
        }
        check_status(response.status(), "failed to get object")?;

        let bytes = response
            .bytes()
            .await
            .map_err(|cause| BackendError::reqwest("failed to read object body", cause))?;
        Ok(Some(bytes))
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn stat_object(&self, key: &str) -> BackendResult<Option<u64>> {
        let builder = self.client.head(self.object_url(key));
        let response = self.send(builder, "failed to stat object").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status(), "failed to stat object")?;

        content_length(&response, "failed to stat object").map(Some)
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn delete_object(&self, key: &str) -> BackendResult<bool> {
        tracing::debug!("Deleting from s3_compatible backend");
        let builder = self.client.delete(self.object_url(key));
        let response = self.send(builder, "failed to delete object").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response.status(), "failed to delete object")?;
        Ok(true)
    }
}

/// Maps non-success status codes to [`BackendError::Status`].
pub(crate) fn check_status(status: StatusCode, context: &str) -> BackendResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(BackendError::Status {
            context: context.to_owned(),
            status,
        })
    }
}

/// Reads the `Content-Length` of a `HEAD` response.
///
/// `Response::content_length` reports the length of the (empty) body for `HEAD` requests, so the
/// header is parsed directly. A missing header is an error, since an object of unknown size cannot
/// be told apart from an empty one.
pub(crate) fn content_length(response: &Response, context: &str) -> BackendResult<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| BackendError::InvalidResponse {
            context: context.to_owned(),
            message: "missing or invalid Content-Length".to_owned(),
        })
}
