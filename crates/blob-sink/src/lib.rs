//! Pluggable archival destinations for downloaded video blobs.
//!
//! One trait (`BlobSink`), four adapters: disk (the fully built reference
//! adapter), S3, GCS, and a no-op `none` backend.

mod disk;
mod gcs;
mod none;
mod s3;

pub use disk::Disk;
pub use gcs::Gcs;
pub use none::None as NoneSink;
pub use s3::S3;

use tokio::io::AsyncRead;

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, thiserror::Error)]
pub enum BlobSinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("s3 error: {0}")]
    S3(String),
    #[error("gcs error: {0}")]
    Gcs(String),
}

/// A destination that archived video bytes can be staged into.
///
/// `save` takes an `AsyncRead` rather than a byte buffer since videos are
/// staged from a temporary file on disk and streamed, not buffered whole.
#[async_trait::async_trait]
pub trait BlobSink: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, BlobSinkError>;

    /// Returns the number of bytes written. Some backends (S3 with an
    /// unknown-length stream) may legitimately report 0; callers must not
    /// branch on the count, only on `Result::Err`.
    async fn save(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobSinkError>;

    async fn delete(&self, name: &str) -> Result<(), BlobSinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_sink_reports_never_exists() {
        let sink = NoneSink::new();
        assert!(!sink.exists("x").await.unwrap());
    }
}
