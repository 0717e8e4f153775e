use crate::{BlobSink, BlobSinkError};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// The reference `BlobSink` adapter: writes under a root directory on the
/// local filesystem, creating parent directories as needed.
pub struct Disk {
    dir_path: PathBuf,
}

impl Disk {
    pub fn new(dir_path: impl Into<PathBuf>) -> Self {
        Disk {
            dir_path: dir_path.into(),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.dir_path.join(name)
    }
}

#[async_trait::async_trait]
impl BlobSink for Disk {
    async fn exists(&self, name: &str) -> Result<bool, BlobSinkError> {
        match tokio::fs::metadata(self.resolve(name)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobSinkError> {
        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    async fn delete(&self, name: &str) -> Result<(), BlobSinkError> {
        tokio::fs::remove_file(self.resolve(name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_exists_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Disk::new(dir.path());

        assert!(!sink.exists("a/b.webm").await.unwrap());

        let mut data: &[u8] = b"hello world";
        let written = sink.save("a/b.webm", &mut data).await.unwrap();
        assert_eq!(written, 11);
        assert!(sink.exists("a/b.webm").await.unwrap());

        sink.delete("a/b.webm").await.unwrap();
        assert!(!sink.exists("a/b.webm").await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Disk::new(dir.path());
        assert!(sink.delete("nope").await.is_err());
    }
}
