//! Render context construction and filename template rendering.
//!
//! The template language is a small `{Field}` substitution grammar over a
//! fixed field set — not a general templating engine, since nothing here
//! needs arbitrary template logic.

use chrono::{DateTime, Datelike, Timelike, Utc};
use feed_model::Entry;

#[derive(Debug, Clone)]
pub struct RenderContext {
    pub author: String,
    pub link_url: String,
    pub title: String,
    pub video_id: String,
    pub channel_id: String,
    pub published: String,
    pub published_year: i32,
    pub published_month: String,
    pub published_day: u32,
    pub published_hour: u32,
    pub published_minute: u32,
    pub published_second: u32,
    pub published_nanosecond: u32,
    pub published_time_zone: String,
    pub published_time_zone_offset_seconds: i32,
    pub video_extension: String,
    pub video_quality: String,
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

impl RenderContext {
    pub fn new(
        entry: &Entry,
        published: DateTime<Utc>,
        video_extension: &str,
        video_quality: &str,
    ) -> Self {
        RenderContext {
            author: entry.author.name.clone(),
            link_url: entry.link.href.clone(),
            title: entry.title.clone(),
            video_id: entry.video_id.clone(),
            channel_id: entry.channel_id.clone(),
            published: published.to_rfc3339(),
            published_year: published.year(),
            published_month: MONTH_NAMES[(published.month0()) as usize].to_owned(),
            published_day: published.day(),
            published_hour: published.hour(),
            published_minute: published.minute(),
            published_second: published.second(),
            published_nanosecond: published.nanosecond(),
            published_time_zone: "UTC".to_owned(),
            published_time_zone_offset_seconds: 0,
            video_extension: video_extension.to_owned(),
            video_quality: video_quality.to_owned(),
        }
    }

    /// Accepts both the long field names and the short aliases used by the
    /// commonly-documented default template (`Year`, `Month`, `Day`,
    /// `Zone`, `Ext`) so a deployer who copies that template verbatim into
    /// `YTFEED_FILENAME_TEMPLATE` doesn't hit an `UnknownField`.
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "Author" => self.author.clone(),
            "LinkURL" => self.link_url.clone(),
            "Title" => self.title.clone(),
            "VideoID" => self.video_id.clone(),
            "ChannelID" => self.channel_id.clone(),
            "Published" => self.published.clone(),
            "PublishedYear" | "Year" => self.published_year.to_string(),
            "PublishedMonth" | "Month" => self.published_month.clone(),
            "PublishedDay" | "Day" => self.published_day.to_string(),
            "PublishedHour" => self.published_hour.to_string(),
            "PublishedMinute" => self.published_minute.to_string(),
            "PublishedSecond" => self.published_second.to_string(),
            "PublishedNanosecond" => self.published_nanosecond.to_string(),
            "PublishedTimeZone" | "Zone" => self.published_time_zone.clone(),
            "PublishedTimeZoneOffsetSeconds" => self.published_time_zone_offset_seconds.to_string(),
            "VideoExtension" | "Ext" => self.video_extension.clone(),
            "VideoQuality" => self.video_quality.clone(),
            _ => return None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown template field {0}")]
    UnknownField(String),
    #[error("unterminated field placeholder")]
    Unterminated,
}

/// Render `template`, substituting every `{Field}` placeholder with the
/// corresponding context value.
pub fn render(template: &str, ctx: &RenderContext) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let end = template[i + 1..]
                .find('}')
                .map(|p| i + 1 + p)
                .ok_or(RenderError::Unterminated)?;
            let field_name = &template[i + 1..end];
            let value = ctx
                .field(field_name)
                .ok_or_else(|| RenderError::UnknownField(field_name.to_owned()))?;
            out.push_str(&value);
            i = end + 1;
        } else {
            let ch = template[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_model::{Author, Link};

    fn entry() -> Entry {
        Entry {
            id: "yt:video:abc".to_owned(),
            video_id: "abc".to_owned(),
            channel_id: "UCxyz".to_owned(),
            title: "A video".to_owned(),
            link: Link {
                rel: "alternate".to_owned(),
                href: "https://www.youtube.com/watch?v=abc".to_owned(),
            },
            author: Author {
                name: "Some Channel".to_owned(),
                uri: "https://www.youtube.com/channel/UCxyz".to_owned(),
            },
            published: "2024-01-02T03:04:05Z".to_owned(),
            updated: "2024-01-02T03:04:05Z".to_owned(),
        }
    }

    #[test]
    fn renders_default_template() {
        let published = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let ctx = RenderContext::new(&entry(), published, "webm", "720");
        let rendered = render(
            "{ChannelID}/{PublishedYear}/{PublishedMonth}/{PublishedDay}/{PublishedTimeZone}/{VideoID}.{VideoExtension}",
            &ctx,
        )
        .unwrap();
        assert_eq!(rendered, "UCxyz/2024/January/2/UTC/abc.webm");
    }

    #[test]
    fn renders_short_alias_template() {
        let published = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let ctx = RenderContext::new(&entry(), published, "webm", "720");
        let rendered = render("{ChannelID}/{Year}/{Month}/{Day}/{Zone}/{VideoID}.{Ext}", &ctx).unwrap();
        assert_eq!(rendered, "UCxyz/2024/January/2/UTC/abc.webm");
    }

    #[test]
    fn unknown_field_errors() {
        let published = Utc::now();
        let ctx = RenderContext::new(&entry(), published, "webm", "720");
        assert!(matches!(
            render("{Bogus}", &ctx),
            Err(RenderError::UnknownField(_))
        ));
    }
}
