use std::fmt;

use bytes::Bytes;
use reqwest::{RequestBuilder, Response, StatusCode};

use super::common::{Backend, BackendError, BackendResult, WriteReceipt, reqwest_client};
use super::s3_compatible::{check_status, content_length};

/// The Blob service REST API version sent with every request.
const API_VERSION: &str = "2021-08-06";

/// A container in an Azure-compatible blob service, such as Azure Storage or Azurite.
///
/// Requests are authorized with a shared access signature (SAS) that is appended to every URL.
/// Containers with public access work without one.
pub struct AzureBlob {
    client: reqwest::Client,

    account_url: String,
    container: String,

    sas_token: Option<String>,
}

impl AzureBlob {
    pub fn new(
        account_url: &str,
        container: &str,
        sas_token: Option<String>,
    ) -> BackendResult<Self> {
        Ok(Self {
            client: reqwest_client()?,
            account_url: account_url.trim_end_matches('/').into(),
            container: container.into(),
            sas_token: sas_token.map(|token| token.trim_start_matches('?').to_owned()),
        })
    }

    fn blob_url(&self, key: &str) -> String {
        let url = format!("{}/{}/{key}", self.account_url, self.container);
        match &self.sas_token {
            Some(token) => format!("{url}?{token}"),
            None => url,
        }
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> BackendResult<Response> {
        builder
            .header("x-ms-version", API_VERSION)
            .send()
            .await
            .map_err(|cause| BackendError::reqwest(context, cause))
    }
}

impl fmt::Debug for AzureBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBlob")
            .field("account_url", &self.account_url)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Backend for AzureBlob {
    fn name(&self) -> &'static str {
        "azure"
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn put_object(&self, key: &str, payload: Bytes) -> BackendResult<WriteReceipt> {
        tracing::debug!("Writing to azure backend");
        let size = payload.len() as u64;
        let builder = self
            .client
            .put(self.blob_url(key))
            .header("x-ms-blob-type", "BlockBlob")
            .body(payload);
        let response = self.send(builder, "failed to put blob").await?;
        check_status(response.status(), "failed to put blob")?;

        Ok(WriteReceipt {
            key: key.to_owned(),
            size,
        })
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn get_object(&self, key: &str) -> BackendResult<Option<Bytes>> {
        tracing::debug!("Reading from azure backend");
        let builder = self.client.get(self.blob_url(key));
        let response = self.send(builder, "failed to get blob").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status(), "failed to get blob")?;

        let bytes = response
            .bytes()
            .await
            .map_err(|cause| BackendError::reqwest("failed to read blob body", cause))?;
        Ok(Some(bytes))
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn stat_object(&self, key: &str) -> BackendResult<Option<u64>> {
        let builder = self.client.head(self.blob_url(key));
        let response = self.send(builder, "failed to stat blob").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status(), "failed to stat blob")?;

        content_length(&response, "failed to stat blob").map(Some)
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn delete_object(&self, key: &str) -> BackendResult<bool> {
        tracing::debug!("Deleting from azure backend");
        let builder = self.client.delete(self.blob_url(key));
        let response = self.send(builder, "failed to delete blob").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response.status(), "failed to delete blob")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_sas_token() {
        let backend = AzureBlob::new(
            "https://account.blob.core.windows.net/",
            "kurma",
            Some("?sv=2021&sig=abc".into()),
        )
        .unwrap();

        assert_eq!(
            backend.blob_url("obj000001"),
            "https://account.blob.core.windows.net/kurma/obj000001?sv=2021&sig=abc"
        );
    }

    #[test]
    fn public_container_without_token() {
        let backend =
            AzureBlob::new("http://127.0.0.1:10000/devstoreaccount1", "c", None).unwrap();
        assert_eq!(
            backend.blob_url("k"),
            "http://127.0.0.1:10000/devstoreaccount1/c/k"
        );
    }
}
