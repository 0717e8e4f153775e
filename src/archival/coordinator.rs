//! The `DataHandler` that deduplicates, resolves publish metadata, renders
//! a destination name, and drives the downloader/blob-sink/retry flow for
//! each non-deletion event.

use crate::archival::downloader;
use crate::archival::platform::{LiveBroadcastContent, PlatformClient};
use crate::archival::render::{self, RenderContext};
use crate::error::ArchivalError;
use crate::handlers::DataHandler;
use crate::schedule::ScheduleEngine;
use blob_sink::BlobSink;
use chrono::{DateTime, Utc};
use feed_model::{Entry, Event};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct ArchivalConfig {
    pub filename_template: String,
    pub video_quality: String,
    pub video_extension: String,
    pub temp_dir: std::path::PathBuf,
    pub downloader_binary: String,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

pub struct ArchivalCoordinator {
    blob: Arc<dyn BlobSink>,
    platform: PlatformClient,
    config: ArchivalConfig,
    in_flight: Mutex<HashSet<String>>,
    schedule: Option<Arc<ScheduleEngine>>,
}

struct InFlightGuard<'a> {
    coordinator: &'a ArchivalCoordinator,
    url: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.leave(&self.url);
    }
}

impl ArchivalCoordinator {
    pub fn new(
        blob: Arc<dyn BlobSink>,
        platform: PlatformClient,
        config: ArchivalConfig,
        schedule: Option<Arc<ScheduleEngine>>,
    ) -> Self {
        ArchivalCoordinator {
            blob,
            platform,
            config,
            in_flight: Mutex::new(HashSet::new()),
            schedule,
        }
    }

    fn try_enter(&self, url: &str) -> bool {
        self.in_flight.lock().unwrap().insert(url.to_owned())
    }

    fn leave(&self, url: &str) {
        self.in_flight.lock().unwrap().remove(url);
    }

    fn determine_published(&self, metadata: &crate::archival::platform::VideoMetadata) -> DateTime<Utc> {
        let raw = if matches!(metadata.live_broadcast_content, LiveBroadcastContent::Live) {
            metadata
                .scheduled_start_time
                .clone()
                .or_else(|| metadata.snippet_published_at.clone())
        } else {
            metadata.snippet_published_at.clone()
        };

        raw.as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }

    async fn process(&self, cancel: CancellationToken, event: Arc<Event>) -> Result<(), ArchivalError> {
        let Some(entry) = event.feed.entry.as_ref() else {
            info!("event is a deletion, skipping archival");
            return Ok(());
        };

        let url = entry.link.href.clone();

        if !self.try_enter(&url) {
            info!(url = %url, "archival already in flight, skipping");
            return Ok(());
        }
        let _guard = InFlightGuard {
            coordinator: self,
            url: url.clone(),
        };

        let metadata = self.platform.video_metadata(&entry.video_id).await?;
        let published = self.determine_published(&metadata);

        let ctx = RenderContext::new(
            entry,
            published,
            &self.config.video_extension,
            &self.config.video_quality,
        );
        let name = render::render(&self.config.filename_template, &ctx)?;

        match metadata.live_broadcast_content {
            LiveBroadcastContent::None | LiveBroadcastContent::Live => {
                let is_live = matches!(metadata.live_broadcast_content, LiveBroadcastContent::Live);
                self.download_with_retries(&cancel, &url, &name, is_live).await
            }
            LiveBroadcastContent::Upcoming => {
                self.register_upcoming(entry, &metadata, event.clone()).await
            }
            other => {
                warn!(url = %url, live_broadcast_content = ?other, "unrecognized liveBroadcastContent, skipping");
                Ok(())
            }
        }
    }

    async fn register_upcoming(
        &self,
        entry: &Entry,
        metadata: &crate::archival::platform::VideoMetadata,
        event: Arc<Event>,
    ) -> Result<(), ArchivalError> {
        let Some(schedule) = &self.schedule else {
            info!(url = %entry.link.href, "upcoming broadcast but no schedule engine attached, skipping");
            return Ok(());
        };
        let Some(start) = metadata.scheduled_start_time.as_deref() else {
            warn!(url = %entry.link.href, "upcoming broadcast has no scheduled start time, skipping");
            return Ok(());
        };
        let Ok(run_at) = DateTime::parse_from_rfc3339(start) else {
            warn!(url = %entry.link.href, start = %start, "could not parse scheduled start time, skipping");
            return Ok(());
        };
        schedule.register_schedule(run_at.with_timezone(&Utc), event).await?;
        Ok(())
    }

    async fn download_video(
        &self,
        cancel: &CancellationToken,
        url: &str,
        name: &str,
        is_live: bool,
    ) -> Result<(), ArchivalError> {
        if self.blob.exists(name).await? {
            return Err(ArchivalError::AlreadyExists(name.to_owned()));
        }

        let scratch = tempfile::Builder::new()
            .prefix("ytbridge-")
            .tempdir_in(&self.config.temp_dir)?;

        let tmp_path = downloader::scratch_file_path(scratch.path(), name);
        let tmp_path_str = tmp_path.to_string_lossy().into_owned();

        let args = downloader::build_args(
            &tmp_path_str,
            url,
            &self.config.video_quality,
            &self.config.video_extension,
            is_live,
        )?;
        downloader::run(&self.config.downloader_binary, &args, cancel).await?;

        let mut file = tokio::fs::File::open(&tmp_path).await?;
        self.blob.save(name, &mut file).await?;

        Ok(())
    }

    async fn download_with_retries(
        &self,
        cancel: &CancellationToken,
        url: &str,
        name: &str,
        is_live: bool,
    ) -> Result<(), ArchivalError> {
        if self.config.retry_delay.is_zero() || self.config.max_retries == 0 {
            return self.download_video(cancel, url, name, is_live).await;
        }

        let mut attempts: u32 = 0;
        loop {
            match self.download_video(cancel, url, name, is_live).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_already_exists() => return Err(e),
                Err(e) => {
                    attempts += 1;
                    if attempts > self.config.max_retries {
                        return Err(e);
                    }
                    warn!(url = %url, attempt = attempts, error = %e, "download attempt failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                        _ = cancel.cancelled() => return Err(ArchivalError::Cancelled),
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DataHandler for ArchivalCoordinator {
    async fn handle(&self, cancel: CancellationToken, event: Arc<Event>) {
        if let Err(e) = self.process(cancel, event).await {
            warn!(error = %e, "archival failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blob_sink::NoneSink;

    fn coordinator() -> ArchivalCoordinator {
        ArchivalCoordinator::new(
            Arc::new(NoneSink::new()),
            PlatformClient::new("unused".to_owned()),
            ArchivalConfig {
                filename_template: "{VideoID}".to_owned(),
                video_quality: "720".to_owned(),
                video_extension: "webm".to_owned(),
                temp_dir: std::env::temp_dir(),
                downloader_binary: "yt-dlp".to_owned(),
                retry_delay: Duration::from_secs(0),
                max_retries: 0,
            },
            None,
        )
    }

    #[test]
    fn second_concurrent_entry_for_same_url_is_rejected() {
        let coordinator = coordinator();
        assert!(coordinator.try_enter("https://www.youtube.com/watch?v=abc"));
        assert!(!coordinator.try_enter("https://www.youtube.com/watch?v=abc"));
        coordinator.leave("https://www.youtube.com/watch?v=abc");
        assert!(coordinator.try_enter("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn distinct_urls_do_not_contend() {
        let coordinator = coordinator();
        assert!(coordinator.try_enter("https://www.youtube.com/watch?v=a"));
        assert!(coordinator.try_enter("https://www.youtube.com/watch?v=b"));
    }
}
