//! Configuration types for podcast-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default filename template used when none is configured
pub const DEFAULT_FILENAME_TEMPLATE: &str =
    "{show.title}/{episode.published_time} - {episode.title}.{ext}";

/// Default filename of the episode record store, created inside the archive directory
pub const DEFAULT_DATABASE_FILENAME: &str = "podcast-dl.db";

/// Byte cap applied to downloads when `debug_partial` is enabled (4 x 256 KiB chunks)
pub const DEBUG_PARTIAL_SIZE: u64 = 4 * 256 * 1024;

/// Main configuration for [`FeedProcessor`](crate::processor::FeedProcessor)
///
/// All fields have sensible defaults so `Config::default()` works out of the box,
/// archiving into the current working directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory into which the archive is written (default: ".")
    #[serde(default = "default_archive_directory")]
    pub archive_directory: PathBuf,

    /// Template used to generate destination filenames
    ///
    /// Recognized placeholders: `{show.title}`, `{show.subtitle}`, `{show.author}`,
    /// `{show.language}`, `{episode.title}`, `{episode.subtitle}`, `{episode.author}`,
    /// `{episode.published_time}` (optionally `{episode.published_time:%Y-%m}`),
    /// `{episode.original_filename}`, `{episode.guid}` and `{ext}`.
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// Replace all special characters in generated paths for maximum
    /// filesystem compatibility
    #[serde(default)]
    pub slugify_paths: bool,

    /// Write episode metadata to a `.info.json` sidecar next to the media file
    #[serde(default)]
    pub write_info_json: bool,

    /// Stop traversing a feed at the first episode already present in the archive
    ///
    /// Useful for cron-style incremental updates of a complete archive.
    #[serde(default)]
    pub update_archive: bool,

    /// Only archive the given number of episodes per feed (0 = unlimited)
    #[serde(default)]
    pub maximum_episode_count: u32,

    /// Maximum number of simultaneous downloads across the entire run (default: 4)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Location of the episode record store
    ///
    /// Defaults to `podcast-dl.db` inside the archive directory.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Ignore the record store when deciding what to download
    ///
    /// Episodes already on disk are still skipped, but store entries are not
    /// consulted, so previously recorded episodes whose files are gone will be
    /// downloaded again.
    #[serde(default)]
    pub ignore_database: bool,

    /// Download only the first [`DEBUG_PARTIAL_SIZE`] bytes of each episode
    /// (debugging affordance, not a failure path)
    #[serde(default)]
    pub debug_partial: bool,

    /// HTTP request timeout (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub http_timeout: Duration,

    /// Retry behavior for transient HTTP failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_directory: default_archive_directory(),
            filename_template: default_filename_template(),
            slugify_paths: false,
            write_info_json: false,
            update_archive: false,
            maximum_episode_count: 0,
            concurrency: default_concurrency(),
            database: None,
            ignore_database: false,
            debug_partial: false,
            http_timeout: default_http_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Resolved path of the episode record store
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.archive_directory.join(DEFAULT_DATABASE_FILENAME))
    }

    /// Byte cap to apply to each download, if any
    pub fn max_download_bytes(&self) -> Option<u64> {
        self.debug_partial.then_some(DEBUG_PARTIAL_SIZE)
    }

    /// Validate the configuration, rejecting values that would only fail later
    ///
    /// This is the misconfiguration boundary: errors from here are the only
    /// ones that escape to the caller instead of being folded into a per-feed
    /// result.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config {
                message: "concurrency must be at least 1".to_string(),
                key: Some("concurrency".to_string()),
            });
        }
        crate::filename::validate_template(&self.filename_template)?;
        Ok(())
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 milliseconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

fn default_archive_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_filename_template() -> String {
    DEFAULT_FILENAME_TEMPLATE.to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
