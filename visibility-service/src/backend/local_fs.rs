use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::common::{Backend, BackendResult, WriteReceipt};

/// Stores objects as plain files below a root directory, such as a shared network mount.
#[derive(Debug)]
pub struct LocalFs {
    path: PathBuf,
}

impl LocalFs {
    pub fn new(path: &Path) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Backend for LocalFs {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn put_object(&self, key: &str, payload: Bytes) -> BackendResult<WriteReceipt> {
        let path = self.path.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&payload).await?;
        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_data().await?;
        drop(file);

        Ok(WriteReceipt {
            key: key.to_owned(),
            size: payload.len() as u64,
        })
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn get_object(&self, key: &str) -> BackendResult<Option<Bytes>> {
        let path = self.path.join(key);
        match tokio::fs::read(path).await {
            Ok(contents) => Ok(Some(contents.into())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn stat_object(&self, key: &str) -> BackendResult<Option<u64>> {
        let path = self.path.join(key);
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn delete_object(&self, key: &str) -> BackendResult<bool> {
        let path = self.path.join(key);
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn probe(&self) -> BackendResult<()> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        if !metadata.is_dir() {
            return Err(std::io::Error::new(
                ErrorKind::NotADirectory,
                format!("{} is not a directory", self.path.display()),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_stats_files() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new(tempdir.path());

        assert_eq!(backend.stat_object("nested/000001").await.unwrap(), None);

        let receipt = backend
            .put_object("nested/000001", Bytes::from_static(b"oh hai!"))
            .await
            .unwrap();
        assert_eq!(receipt.size, 7);

        assert_eq!(backend.stat_object("nested/000001").await.unwrap(), Some(7));
        let contents = backend.get_object("nested/000001").await.unwrap().unwrap();
        assert_eq!(contents.as_ref(), b"oh hai!");
    }

    #[tokio::test]
    async fn overwrites_existing_files() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new(tempdir.path());

        backend
            .put_object("000001", Bytes::from_static(b"first version"))
            .await
            .unwrap();
        backend
            .put_object("000001", Bytes::from_static(b"second"))
            .await
            .unwrap();

        assert_eq!(backend.stat_object("000001").await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let tempdir = tempfile::tempdir().unwrap();
        let backend = LocalFs::new(tempdir.path());

        backend.put_object("000001", Bytes::new()).await.unwrap();
        assert!(backend.delete_object("000001").await.unwrap());
        assert!(!backend.delete_object("000001").await.unwrap());
        assert_eq!(backend.get_object("000001").await.unwrap(), None);
    }

    #[tokio::test]
    async fn probe_requires_directory() {
        let tempdir = tempfile::tempdir().unwrap();
        LocalFs::new(tempdir.path()).probe().await.unwrap();

        let missing = tempdir.path().join("missing");
        assert!(LocalFs::new(&missing).probe().await.is_err());
    }
}
