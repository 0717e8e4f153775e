use crate::{BlobSink, BlobSinkError};
use tokio::io::AsyncRead;

/// No-op sink for `storage_backend = none`: archival is effectively
/// disabled, but the coordinator still runs the rest of its pipeline.
pub struct None;

impl None {
    pub fn new() -> Self {
        None
    }
}

impl Default for None {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BlobSink for None {
    async fn exists(&self, _name: &str) -> Result<bool, BlobSinkError> {
        Ok(false)
    }

    async fn save(
        &self,
        _name: &str,
        _reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobSinkError> {
        Ok(0)
    }

    async fn delete(&self, _name: &str) -> Result<(), BlobSinkError> {
        Ok(())
    }
}
