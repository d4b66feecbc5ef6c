//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Backoff applied to non-success responses
    #[serde(default)]
    pub retry: RetryConfig,

    /// Source site locations
    #[serde(default)]
    pub source: SourceConfig,

    /// Incremental update behavior
    #[serde(default)]
    pub update: UpdateConfig,

    /// Chat notification settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(AppError::validation("retry.multiplier must be >= 1.0"));
        }
        if self.retry.initial_interval_ms > self.retry.max_interval_ms {
            return Err(AppError::validation(
                "retry.initial_interval_ms must not exceed retry.max_interval_ms",
            ));
        }
        if url::Url::parse(&self.source.base_url).is_err() {
            return Err(AppError::validation(format!(
                "source.base_url '{}' is not a valid URL",
                self.source.base_url
            )));
        }
        if !self.source.feed_url_template.contains("{id}") {
            return Err(AppError::validation(
                "source.feed_url_template must contain an {id} placeholder",
            ));
        }
        if self.source.snapshot_marker.is_empty() {
            return Err(AppError::validation("source.snapshot_marker is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay after each request in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests, also the number of units worked at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Exponential backoff settings for responses with status >= 300.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// First sleep in milliseconds
    #[serde(default = "defaults::initial_interval")]
    pub initial_interval_ms: u64,

    /// Growth factor applied after each sleep
    #[serde(default = "defaults::multiplier")]
    pub multiplier: f64,

    /// Ceiling for a single sleep in milliseconds
    #[serde(default = "defaults::max_interval")]
    pub max_interval_ms: u64,

    /// Total attempts including the first request
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl RetryConfig {
    /// Sleep before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let millis = (self.initial_interval_ms as f64 * factor).min(self.max_interval_ms as f64);
        Duration::from_millis(millis as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: defaults::initial_interval(),
            multiplier: defaults::multiplier(),
            max_interval_ms: defaults::max_interval(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

/// Where the reports live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root that relative links resolve against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the unit directory page
    #[serde(default = "defaults::directory_path")]
    pub directory_path: String,

    /// Project document feed, `{id}` is replaced by the project id
    #[serde(default = "defaults::feed_url_template")]
    pub feed_url_template: String,

    /// Text that marks a snapshot link on a unit page
    #[serde(default = "defaults::snapshot_marker")]
    pub snapshot_marker: String,
}

impl SourceConfig {
    pub fn directory_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.directory_path
        )
    }

    pub fn feed_url(&self, project_id: &str) -> String {
        self.feed_url_template.replace("{id}", project_id)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            directory_path: defaults::directory_path(),
            feed_url_template: defaults::feed_url_template(),
            snapshot_marker: defaults::snapshot_marker(),
        }
    }
}

/// How many new snapshots a stale unit parses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Only the newest snapshot
    #[default]
    Latest,
    /// Every snapshot newer than the known latest, oldest first
    CatchUp,
}

/// Incremental update settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub mode: UpdateMode,

    /// Fetch document metadata for projects with an id
    #[serde(default = "defaults::enabled")]
    pub fetch_documents: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            mode: UpdateMode::default(),
            fetch_documents: true,
        }
    }
}

/// Chat notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Incoming webhook; notifications are only logged when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Download and store every document found in the feeds
    #[serde(default)]
    pub archive_documents: bool,
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; sopa-tracker/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Retry defaults
    pub fn initial_interval() -> u64 {
        500
    }
    pub fn multiplier() -> f64 {
        1.5
    }
    pub fn max_interval() -> u64 {
        60_000
    }
    pub fn max_attempts() -> u32 {
        8
    }

    // Source defaults
    pub fn base_url() -> String {
        "https://www.fs.fed.us".into()
    }
    pub fn directory_path() -> String {
        "/sopa/nav-page.php".into()
    }
    pub fn feed_url_template() -> String {
        "https://www.fs.fed.us/nepa/nepa_project_feed.php?project={id}".into()
    }
    pub fn snapshot_marker() -> String {
        "html".into()
    }

    pub fn enabled() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unbounded_retry() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_template_without_placeholder() {
        let mut config = Config::default();
        config.source.feed_url_template = "https://example.com/feed".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig {
            initial_interval_ms: 100,
            multiplier: 2.0,
            max_interval_ms: 500,
            max_attempts: 10,
        };
        assert_eq!(retry.backoff(0), Duration::from_millis(100));
        assert_eq!(retry.backoff(1), Duration::from_millis(200));
        assert_eq!(retry.backoff(2), Duration::from_millis(400));
        assert_eq!(retry.backoff(3), Duration::from_millis(500));
        assert_eq!(retry.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [update]
            mode = "catch_up"

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.update.mode, UpdateMode::CatchUp);
        assert!(config.update.fetch_documents);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_interval_ms, 500);
        assert_eq!(config.source.directory_url(), "https://www.fs.fed.us/sopa/nav-page.php");
    }

    #[test]
    fn feed_url_substitutes_id() {
        let source = SourceConfig::default();
        assert!(source.feed_url("58124").ends_with("project=58124"));
    }
}
