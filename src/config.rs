//! Environment-driven configuration loading.
//!
//! All variables are read with a `YTFEED_` prefix (e.g. `YTFEED_HOST`),
//! mirroring the service's original environment contract. Unlike a TOML
//! file, there is no nested structure on the wire, so the `Raw` struct
//! here just holds `Option<String>` per variable; defaulting and
//! validation happen in [`Config::load`].

use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = ":8123";
pub const DEFAULT_RESUB_TARGET_ADDR: &str = "https://pubsubhubbub.appspot.com/subscribe";
pub const DEFAULT_RESUB_INTERVAL_SECS: u64 = 72 * 3600;
// The long field names are canonical; `render::field` also accepts the
// short aliases (`Year`/`Month`/`Day`/`Zone`/`Ext`) that commonly-quoted
// docs use, so either spelling of this default works in
// `YTFEED_FILENAME_TEMPLATE`.
pub const DEFAULT_FILENAME_TEMPLATE: &str =
    "{ChannelID}/{PublishedYear}/{PublishedMonth}/{PublishedDay}/{PublishedTimeZone}/{VideoID}.{VideoExtension}";
pub const DEFAULT_VIDEO_FORMAT_QUALITY: &str = "720";
pub const DEFAULT_VIDEO_FORMAT_EXTENSION: &str = "webm";
pub const DEFAULT_REDIS_CHANNEL: &str = "ytfeed";
pub const DEFAULT_SCHEDULER_RETRY_DELAY_SECS: u64 = 60;
pub const DEFAULT_SCHEDULER_MAX_RETRIES: i64 = 5;
pub const DEFAULT_SCHEDULER_WORKER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_VIDEO_DOWNLOAD_MAX_RETRIES: i64 = 5;
pub const DEFAULT_TEMPORARY_FILE_DIR: &str = "./";
pub const DEFAULT_AMQP_EXCHANGE: &str = "ytfeed";
pub const DEFAULT_AMQP_KEY: &str = "schedule";
pub const DEFAULT_AMQP_EXCHANGE_KIND: &str = "topic";
pub const DEFAULT_DOWNLOADER_BINARY: &str = "yt-dlp";

const VALID_STORAGE_BACKENDS: &[&str] = &["s3", "gcs", "disk", "none"];
const VALID_QUALITIES: &[&str] = &["1080", "720", "640", "480", "360", "240", "144"];
const VALID_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];
const VALID_AMQP_EXCHANGE_KINDS: &[&str] = &["direct", "fanout", "topic", "headers"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingField(String),
    #[error("invalid config value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Gcs,
    Disk,
    None,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone)]
pub struct GcsConfig {
    pub credential_json_file_path: Option<String>,
    pub bucket_name: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub addr: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub channel: String,
    pub db: i64,
}

#[derive(Debug, Clone)]
pub struct AmqpConfig {
    pub dsn: String,
    pub exchange: String,
    pub key: String,
    pub publish_mandatory: bool,
    pub publish_immediate: bool,
    pub exchange_kind: String,
    pub exchange_durable: bool,
    pub exchange_auto_delete: bool,
    pub exchange_internal: bool,
    pub exchange_no_wait: bool,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub database_path: String,
    pub retry_delay: Duration,
    pub worker_interval: Duration,
    pub max_retries: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub version: String,
    pub host: String,
    pub youtube_api_key: String,
    pub verification_token: String,

    pub resub_target_addr: String,
    pub resub_topic: String,
    pub resub_callback_addr: String,
    pub resub_interval: Duration,
    pub resub_secret: Option<String>,

    pub storage_backend: StorageBackend,
    pub s3: Option<S3Config>,
    pub gcs: Option<GcsConfig>,
    pub disk_directory: Option<String>,

    pub filename_template: String,
    pub video_format_quality: String,
    pub video_format_extension: String,
    pub video_download_max_retries: i64,
    pub video_download_retry_delay: Duration,
    pub temporary_file_dir: String,
    pub downloader_binary: String,

    pub redis: Option<RedisConfig>,
    pub scheduler: Option<SchedulerConfig>,
    pub amqp: Option<AmqpConfig>,
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("YTFEED_{name}")).ok().filter(|s| !s.is_empty())
}

fn env_duration_secs(name: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    match env_var(name) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(raw) => {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: name.to_owned(),
                value: raw.clone(),
            })?;
            Ok(Duration::from_secs(secs))
        }
    }
}

fn env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            field: name.to_owned(),
            value: raw,
        }),
    }
}

fn env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            field: name.to_owned(),
            value: raw,
        }),
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env_var(name).ok_or_else(|| ConfigError::MissingField(format!("YTFEED_{name}")))
}

fn one_of(name: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let version = env_var("VERSION").unwrap_or_else(|| "v1.0.0".to_owned());
        let host = env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let youtube_api_key = required("YOUTUBE_API_KEY")?;
        let verification_token = required("VERIFICATION_TOKEN")?;

        let resub_target_addr =
            env_var("RESUB_TARGET_ADDR").unwrap_or_else(|| DEFAULT_RESUB_TARGET_ADDR.to_owned());
        let resub_topic = required("RESUB_TOPIC")?;
        let resub_callback_addr = required("RESUB_CALLBACK_ADDR")?;
        let resub_interval = env_duration_secs("RESUB_INTERVAL", DEFAULT_RESUB_INTERVAL_SECS)?;
        let resub_secret = env_var("RESUB_SECRET");

        let storage_backend_raw = required("STORAGE_BACKEND")?;
        one_of("STORAGE_BACKEND", &storage_backend_raw, VALID_STORAGE_BACKENDS)?;
        let storage_backend = match storage_backend_raw.as_str() {
            "s3" => StorageBackend::S3,
            "gcs" => StorageBackend::Gcs,
            "disk" => StorageBackend::Disk,
            _ => StorageBackend::None,
        };

        let disk_directory = env_var("DISK_DIRECTORY");
        let s3 = build_s3_config()?;
        let gcs = build_gcs_config()?;

        match storage_backend {
            StorageBackend::Disk if disk_directory.is_none() => {
                return Err(ConfigError::InvalidValue {
                    field: "DISK_DIRECTORY".to_owned(),
                    value: String::new(),
                });
            }
            StorageBackend::Gcs if gcs.is_none() => {
                return Err(ConfigError::InvalidValue {
                    field: "GCS_BUCKET_NAME".to_owned(),
                    value: String::new(),
                });
            }
            StorageBackend::S3 if s3.is_none() => {
                return Err(ConfigError::InvalidValue {
                    field: "S3_*".to_owned(),
                    value: String::new(),
                });
            }
            _ => {}
        }

        let filename_template =
            env_var("FILENAME_TEMPLATE").unwrap_or_else(|| DEFAULT_FILENAME_TEMPLATE.to_owned());
        let video_format_quality =
            env_var("VIDEO_FORMAT_QUALITY").unwrap_or_else(|| DEFAULT_VIDEO_FORMAT_QUALITY.to_owned());
        one_of("VIDEO_FORMAT_QUALITY", &video_format_quality, VALID_QUALITIES)?;
        let video_format_extension =
            env_var("VIDEO_FORMAT_EXTENSION").unwrap_or_else(|| DEFAULT_VIDEO_FORMAT_EXTENSION.to_owned());
        one_of("VIDEO_FORMAT_EXTENSION", &video_format_extension, VALID_EXTENSIONS)?;
        let video_download_max_retries =
            env_i64("VIDEO_DOWNLOAD_MAX_RETRIES", DEFAULT_VIDEO_DOWNLOAD_MAX_RETRIES)?;
        let video_download_retry_delay = env_duration_secs("VIDEO_DOWNLOAD_RETRY_DELAY", 0)?;
        let temporary_file_dir =
            env_var("TEMPORARY_FILE_DIR").unwrap_or_else(|| DEFAULT_TEMPORARY_FILE_DIR.to_owned());
        let downloader_binary =
            env_var("DOWNLOADER_BINARY").unwrap_or_else(|| DEFAULT_DOWNLOADER_BINARY.to_owned());

        let redis = build_redis_config()?;
        let scheduler = build_scheduler_config()?;
        let amqp = build_amqp_config()?;

        Ok(Config {
            version,
            host,
            youtube_api_key,
            verification_token,
            resub_target_addr,
            resub_topic,
            resub_callback_addr,
            resub_interval,
            resub_secret,
            storage_backend,
            s3,
            gcs,
            disk_directory,
            filename_template,
            video_format_quality,
            video_format_extension,
            video_download_max_retries,
            video_download_retry_delay,
            temporary_file_dir,
            downloader_binary,
            redis,
            scheduler,
            amqp,
        })
    }
}

fn build_s3_config() -> Result<Option<S3Config>, ConfigError> {
    let endpoint = env_var("S3_ENDPOINT");
    let access_key_id = env_var("S3_ACCESS_KEY_ID");
    let secret_access_key = env_var("S3_SECRET_ACCESS_KEY");
    let bucket_name = env_var("S3_BUCKET_NAME");
    match (endpoint, access_key_id, secret_access_key, bucket_name) {
        (Some(endpoint), Some(access_key_id), Some(secret_access_key), Some(bucket_name)) => {
            Ok(Some(S3Config {
                endpoint,
                access_key_id,
                secret_access_key,
                bucket_name,
            }))
        }
        (None, None, None, None) => Ok(None),
        _ => Err(ConfigError::InvalidValue {
            field: "S3_*".to_owned(),
            value: "incomplete s3 configuration".to_owned(),
        }),
    }
}

fn build_gcs_config() -> Result<Option<GcsConfig>, ConfigError> {
    match env_var("GCS_BUCKET_NAME") {
        Some(bucket_name) => Ok(Some(GcsConfig {
            bucket_name,
            credential_json_file_path: env_var("GCS_CREDENTIAL_JSON_FILE_PATH"),
        })),
        None => Ok(None),
    }
}

fn build_redis_config() -> Result<Option<RedisConfig>, ConfigError> {
    match env_var("REDIS_ADDR") {
        Some(addr) => Ok(Some(RedisConfig {
            addr,
            username: env_var("REDIS_USERNAME"),
            password: env_var("REDIS_PASSWORD"),
            channel: env_var("REDIS_CHANNEL").unwrap_or_else(|| DEFAULT_REDIS_CHANNEL.to_owned()),
            db: env_i64("REDIS_DB", 0)?,
        })),
        None => Ok(None),
    }
}

fn build_scheduler_config() -> Result<Option<SchedulerConfig>, ConfigError> {
    match env_var("SCHEDULE_DB_PATH") {
        Some(database_path) => Ok(Some(SchedulerConfig {
            database_path,
            retry_delay: env_duration_secs(
                "STREAM_SCHEDULER_RETRY_DELAY",
                DEFAULT_SCHEDULER_RETRY_DELAY_SECS,
            )?,
            worker_interval: env_duration_secs(
                "STREAM_SCHEDULER_WORKER_INTERVAL",
                DEFAULT_SCHEDULER_WORKER_INTERVAL_SECS,
            )?,
            max_retries: env_i64("STREAM_SCHEDULER_MAX_RETRIES", DEFAULT_SCHEDULER_MAX_RETRIES)?,
        })),
        None => Ok(None),
    }
}

fn build_amqp_config() -> Result<Option<AmqpConfig>, ConfigError> {
    match env_var("AMQP_DSN") {
        Some(dsn) => {
            let exchange_kind =
                env_var("AMQP_EXCHANGE_KIND").unwrap_or_else(|| DEFAULT_AMQP_EXCHANGE_KIND.to_owned());
            one_of("AMQP_EXCHANGE_KIND", &exchange_kind, VALID_AMQP_EXCHANGE_KINDS)?;
            Ok(Some(AmqpConfig {
                dsn,
                exchange: env_var("AMQP_EXCHANGE").unwrap_or_else(|| DEFAULT_AMQP_EXCHANGE.to_owned()),
                key: env_var("AMQP_KEY").unwrap_or_else(|| DEFAULT_AMQP_KEY.to_owned()),
                publish_mandatory: env_bool("AMQP_PUBLISH_MANDATORY", true)?,
                publish_immediate: env_bool("AMQP_PUBLISH_IMMEDIATE", false)?,
                exchange_kind,
                exchange_durable: env_bool("AMQP_EXCHANGE_DURABLE", true)?,
                exchange_auto_delete: env_bool("AMQP_EXCHANGE_AUTO_DELETE", false)?,
                exchange_internal: env_bool("AMQP_EXCHANGE_INTERNAL", false)?,
                exchange_no_wait: env_bool("AMQP_EXCHANGE_NO_WAIT", false)?,
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_of_rejects_unknown_value() {
        assert!(one_of("X", "bogus", VALID_STORAGE_BACKENDS).is_err());
        assert!(one_of("X", "disk", VALID_STORAGE_BACKENDS).is_ok());
    }
}
