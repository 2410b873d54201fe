use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sitegraph
///
/// Every section and key is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Minimum spacing between the starts of any two requests (seconds)
    #[serde(rename = "rate-limit")]
    pub rate_limit: f64,

    /// Retries per URL after transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// First backoff delay (seconds); doubles with every retry
    #[serde(rename = "backoff-base")]
    pub backoff_base: f64,

    /// Global deadline for the whole crawl (seconds, 0 = none)
    #[serde(rename = "crawl-timeout")]
    pub crawl_timeout: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            rate_limit: 1.0,
            max_retries: 3,
            request_timeout: 15,
            backoff_base: 1.0,
            crawl_timeout: 0,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn backoff_base_duration(&self) -> Duration {
        if self.backoff_base.is_finite() && self.backoff_base > 0.0 {
            Duration::try_from_secs_f64(self.backoff_base).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    /// `None` when no global deadline is configured
    pub fn crawl_timeout_duration(&self) -> Option<Duration> {
        (self.crawl_timeout > 0).then(|| Duration::from_secs(self.crawl_timeout))
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "sitegraph".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory all output files are written to
    pub directory: String,

    /// Write `<base>_stats.json`
    pub stats: bool,

    /// Write `<base>_links.json`
    pub links: bool,

    /// Write `<base>_summary.md`
    pub summary: bool,

    /// Write `<base>_graph.db`
    pub database: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            stats: true,
            links: true,
            summary: true,
            database: false,
        }
    }
}
