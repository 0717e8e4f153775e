//! Per-subsystem error taxonomy. One `thiserror` enum per subsystem rather
//! than a single crate-wide error type, matching the services' own
//! `DbError`/`JournalError` split.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("verify token mismatch")]
    VerifyTokenMismatch,
    #[error("unrecognized topic")]
    UnrecognizedTopic,
    #[error("unrecognized hub.mode")]
    UnrecognizedMode,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("malformed signature header: {0}")]
    MalformedSignature(String),
    #[error("malformed notification body: {0}")]
    MalformedBody(#[from] feed_model::FeedParseError),
}

#[derive(Debug, Error)]
pub enum ArchivalError {
    #[error("already downloading video at {0}")]
    AlreadyInFlight(String),
    #[error("object {0} already exists")]
    AlreadyExists(String),
    #[error("platform metadata lookup failed: {0}")]
    Platform(#[from] reqwest::Error),
    #[error("platform error: {0}")]
    PlatformMetadata(#[from] crate::archival::platform::PlatformError),
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("invalid video quality: {0}")]
    InvalidQuality(String),
    #[error("invalid video extension: {0}")]
    InvalidExtension(String),
    #[error("downloader exited with status {status}: {stderr}")]
    DownloaderFailed { status: i32, stderr: String },
    #[error("downloader could not be spawned: {0}")]
    DownloaderSpawn(std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blob sink error: {0}")]
    BlobSink(#[from] blob_sink::BlobSinkError),
    #[error("template render error: {0}")]
    Render(#[from] crate::archival::render::RenderError),
    #[error("cancelled")]
    Cancelled,
}

impl ArchivalError {
    /// True for the sentinel that must never be retried.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ArchivalError::AlreadyExists(_))
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ResubscribeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("hub returned status {0}")]
    HubRejected(u16),
}
