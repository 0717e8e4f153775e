//! Client for the platform's video-metadata endpoint (YouTube Data API
//! `videos.list`, parts `snippet` and `liveStreamingDetails`).

use reqwest::Client;
use serde::Deserialize;

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveBroadcastContent {
    None,
    Live,
    Completed,
    Upcoming,
    Other(String),
}

impl LiveBroadcastContent {
    fn parse(raw: &str) -> Self {
        match raw {
            "none" => Self::None,
            "live" => Self::Live,
            "completed" => Self::Completed,
            "upcoming" => Self::Upcoming,
            other => Self::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub live_broadcast_content: LiveBroadcastContent,
    pub snippet_published_at: Option<String>,
    pub scheduled_start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosListResponse {
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    #[serde(rename = "liveStreamingDetails")]
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(rename = "liveBroadcastContent")]
    live_broadcast_content: String,
}

#[derive(Debug, Deserialize)]
struct LiveStreamingDetails {
    #[serde(rename = "scheduledStartTime")]
    scheduled_start_time: Option<String>,
}

pub struct PlatformClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no item in video list response for {0}")]
    NotFound(String),
}

impl PlatformClient {
    pub fn new(api_key: String) -> Self {
        PlatformClient {
            client: Client::new(),
            api_key,
        }
    }

    pub async fn video_metadata(&self, video_id: &str) -> Result<VideoMetadata, PlatformError> {
        let response: VideosListResponse = self
            .client
            .get(VIDEOS_ENDPOINT)
            .query(&[
                ("part", "snippet,liveStreamingDetails"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound(video_id.to_owned()))?;

        let live_broadcast_content = LiveBroadcastContent::parse(&item.snippet.live_broadcast_content);

        Ok(VideoMetadata {
            live_broadcast_content,
            snippet_published_at: Some(item.snippet.published_at),
            scheduled_start_time: item.live_streaming_details.and_then(|d| d.scheduled_start_time),
        })
    }
}
