//! Atom feed types for the WebSub video-upload notification and parsing
//! from the raw XML body delivered by the hub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix every subscribed topic URL must start with.
pub const TOPIC_PREFIX: &str = "https://www.youtube.com/xml/feeds/videos.xml?channel_id=";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    #[serde(rename = "@rel")]
    pub rel: String,
    #[serde(rename = "@href")]
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Author {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename = "entry")]
pub struct Entry {
    pub id: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    pub title: String,
    pub link: Link,
    pub author: Author,
    pub published: String,
    pub updated: String,
}

/// quick-xml's serde deserializer matches on the local tag name and strips
/// any namespace prefix (`yt:`, `at:`), so these `rename`s must omit it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeletedEntry {
    #[serde(rename = "@ref")]
    pub reference: String,
    #[serde(rename = "@when")]
    pub when: String,
    pub link: Option<Link>,
    #[serde(rename = "by")]
    pub by: Option<DeletedEntryAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeletedEntryAuthor {
    pub name: Option<String>,
}

/// A notification body as it arrives on the wire: either a new/updated
/// entry or a deletion notice. YouTube's feed never sends both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Feed {
    #[serde(rename = "entry", default)]
    pub entry: Option<Entry>,
    #[serde(rename = "deleted-entry", default)]
    pub deleted_entry: Option<DeletedEntry>,
}

/// A parsed notification plus the raw bytes it was parsed from, preserved
/// for downstream re-publication (messaging sinks forward the original
/// XML alongside the decoded form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub feed: Feed,
    pub raw_xml: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("malformed atom feed: {0}")]
    Xml(#[from] quick_xml::de::DeError),
    #[error("feed contained neither an entry nor a deleted-entry")]
    Empty,
}

impl Event {
    /// Parse a raw Atom XML notification body into an `Event`.
    pub fn parse(raw_xml: &str) -> Result<Self, FeedParseError> {
        let feed: Feed = quick_xml::de::from_str(raw_xml)?;
        if feed.entry.is_none() && feed.deleted_entry.is_none() {
            return Err(FeedParseError::Empty);
        }
        Ok(Event {
            feed,
            raw_xml: raw_xml.to_owned(),
        })
    }

    pub fn is_deletion(&self) -> bool {
        self.feed.deleted_entry.is_some()
    }
}

impl Entry {
    /// Parse `published` as RFC 3339; callers fall back to "now" on error,
    /// per the render-context contract.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.published)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPLOAD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>yt:video:abc123</id>
    <yt:videoId>abc123</yt:videoId>
    <yt:channelId>UCxyz</yt:channelId>
    <title>A new video</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=abc123"/>
    <author>
      <name>Some Channel</name>
      <uri>https://www.youtube.com/channel/UCxyz</uri>
    </author>
    <published>2024-01-02T03:04:05+00:00</published>
    <updated>2024-01-02T03:04:05+00:00</updated>
  </entry>
</feed>"#;

    const DELETE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:at="http://purl.org/atompub/tombstones/1.0" xmlns="http://www.w3.org/2005/Atom">
  <at:deleted-entry ref="yt:video:abc123" when="2024-01-02T03:04:05+00:00">
    <link href="https://www.youtube.com/watch?v=abc123"/>
    <at:by><name>Some Channel</name></at:by>
  </at:deleted-entry>
</feed>"#;

    #[test]
    fn parses_upload_entry() {
        let event = Event::parse(UPLOAD_XML).unwrap();
        assert!(!event.is_deletion());
        let entry = event.feed.entry.unwrap();
        assert_eq!(entry.video_id, "abc123");
        assert_eq!(entry.channel_id, "UCxyz");
    }

    #[test]
    fn parses_deleted_entry() {
        let event = Event::parse(DELETE_XML).unwrap();
        assert!(event.is_deletion());
        let deleted = event.feed.deleted_entry.unwrap();
        assert_eq!(deleted.reference, "yt:video:abc123");
        assert_eq!(deleted.when, "2024-01-02T03:04:05+00:00");
        assert_eq!(
            deleted.link.unwrap().href,
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn parses_deleted_entry_without_link_or_actor() {
        const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:at="http://purl.org/atompub/tombstones/1.0" xmlns="http://www.w3.org/2005/Atom">
  <at:deleted-entry ref="yt:video:abc123" when="2024-01-02T03:04:05+00:00"/>
</feed>"#;
        let event = Event::parse(XML).unwrap();
        let deleted = event.feed.deleted_entry.unwrap();
        assert!(deleted.link.is_none());
        assert!(deleted.by.is_none());
    }

    #[test]
    fn rejects_empty_feed() {
        let empty = r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
        assert!(matches!(Event::parse(empty), Err(FeedParseError::Empty)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Event::parse("not xml at all").is_err());
    }
}
