//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Passing every request, redirect hops included, through the shared pacing gate
//! - Retry with exponential backoff for transient failures
//! - Error classification into rejected and unreachable

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::observer::{CrawlObserver, FetchEvent, FetchOutcome};
use crate::state::RateGate;
use crate::url::CanonicalUrl;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// Upper bound on a single backoff sleep
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against this
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: String,
    pub body: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Why a URL could not be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Non-retryable outcome: 4xx, non-HTML content, redirect errors
    Rejected,

    /// Retry budget exhausted on transient failures
    Unreachable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => f.write_str("rejected"),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// A per-URL fetch failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub status_code: Option<u16>,
    pub detail: String,
    pub attempts: u32,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success(FetchedPage),

    /// The URL is rejected or unreachable
    Failure(FetchFailure),

    /// The stop signal fired before the fetch concluded
    Cancelled,
}

/// Result of one attempt, before retry policy is applied
#[derive(Debug)]
enum Attempt {
    Page {
        final_url: Url,
        status_code: u16,
        content_type: String,
        body: String,
    },
    Transient {
        status_code: Option<u16>,
        detail: String,
    },
    Rejected {
        status_code: Option<u16>,
        detail: String,
    },
    Cancelled,
}

/// Retry budget and backoff schedule for transient failures
///
/// `max_retries` counts retries after the first attempt, not total attempts:
/// a URL gets up to `max_retries + 1` attempts, so `max_retries = 3` allows 4
/// and `max_retries = 0` means a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base_duration(),
        }
    }

    /// Total attempts allowed per URL
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the retry following failed attempt number `attempt`
    ///
    /// Doubles with every failure (`base`, `2*base`, `4*base`, ...) and never
    /// exceeds `MAX_BACKOFF`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

/// Formats the user agent string sent with every request
///
/// Format: `CrawlerName/Version (+ContactURL)`, or `CrawlerName/Version` when
/// no contact URL is configured.
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    match config.contact_url.as_deref() {
        Some(contact) if !contact.is_empty() => format!(
            "{}/{} (+{})",
            config.crawler_name, config.crawler_version, contact
        ),
        _ => format!("{}/{}", config.crawler_name, config.crawler_version),
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `request_timeout` - Total time allowed for one request, body included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitegraph::config::UserAgentConfig;
/// use sitegraph::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Sitegraph".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: Some("https://example.com/about".to_string()),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(request_timeout)
        .connect_timeout(request_timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for content types the link extractor can read
fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Rate-limited, retrying page fetcher
///
/// Holds no per-URL state; the only thing shared across calls is the pacing
/// gate.
pub struct Fetcher {
    client: Client,
    gate: Arc<RateGate>,
    retry: RetryPolicy,
    observer: Arc<dyn CrawlObserver>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        gate: Arc<RateGate>,
        retry: RetryPolicy,
        observer: Arc<dyn CrawlObserver>,
    ) -> Self {
        Self {
            client,
            gate,
            retry,
            observer,
        }
    }

    /// Fetches a URL with pacing, retry and classification
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx with HTML content | Success |
    /// | 2xx with other content | Immediate → Rejected |
    /// | HTTP 429, 5xx | Retry with backoff → Unreachable |
    /// | Other 4xx, unfollowed 3xx | Immediate → Rejected |
    /// | Timeout, connection error, body read error | Retry with backoff → Unreachable |
    /// | Redirect loop, too many redirects, 3xx without usable Location | Immediate → Rejected |
    ///
    /// Every attempt waits on the shared gate first and is reported to the
    /// observer. Redirects are followed here rather than by the client so each
    /// hop waits on the gate too. `cancel` is honoured while waiting on the gate, while the
    /// request is in progress and during backoff.
    pub async fn fetch(&self, url: &CanonicalUrl, cancel: &CancellationToken) -> FetchResult {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if !self.gate.acquire(cancel).await {
                return FetchResult::Cancelled;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return FetchResult::Cancelled,
                result = self.attempt(url, cancel) => result,
            };

            match result {
                Attempt::Cancelled => return FetchResult::Cancelled,
                Attempt::Page {
                    final_url,
                    status_code,
                    content_type,
                    body,
                } => {
                    self.report(url, FetchOutcome::Success, attempt, false, Some(status_code), None);
                    return FetchResult::Success(FetchedPage {
                        final_url,
                        status_code,
                        content_type,
                        body,
                        attempts: attempt,
                    });
                }
                Attempt::Rejected {
                    status_code,
                    detail,
                } => {
                    self.report(
                        url,
                        FetchOutcome::Rejected,
                        attempt,
                        false,
                        status_code,
                        Some(detail.clone()),
                    );
                    return FetchResult::Failure(FetchFailure {
                        kind: FailureKind::Rejected,
                        status_code,
                        detail,
                        attempts: attempt,
                    });
                }
                Attempt::Transient {
                    status_code,
                    detail,
                } => {
                    let will_retry = attempt < max_attempts;
                    self.report(
                        url,
                        FetchOutcome::Unreachable,
                        attempt,
                        will_retry,
                        status_code,
                        Some(detail.clone()),
                    );

                    if !will_retry {
                        return FetchResult::Failure(FetchFailure {
                            kind: FailureKind::Unreachable,
                            status_code,
                            detail,
                            attempts: attempt,
                        });
                    }

                    let delay = self.retry.backoff(attempt);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return FetchResult::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Performs a single GET, following redirects, and classifies the response
    ///
    /// The caller has already passed the gate for the first request; every
    /// further hop acquires it again.
    async fn attempt(&self, url: &CanonicalUrl, cancel: &CancellationToken) -> Attempt {
        let mut current = url.as_url().clone();
        let mut seen = vec![current.clone()];

        let response = loop {
            let response = match self.client.get(current.clone()).send().await {
                Ok(response) => response,
                Err(e) => return classify_error(&e),
            };

            let status = response.status();
            if !status.is_redirection() {
                break response;
            }

            let status_code = Some(status.as_u16());
            let next = match redirect_target(&current, &response) {
                Some(next) => next,
                None => {
                    return Attempt::Rejected {
                        status_code,
                        detail: format!("HTTP {} without a usable Location", status),
                    }
                }
            };

            if seen.contains(&next) {
                return Attempt::Rejected {
                    status_code,
                    detail: format!("Redirect loop at {}", next),
                };
            }
            if seen.len() > MAX_REDIRECTS {
                return Attempt::Rejected {
                    status_code,
                    detail: format!("More than {} redirects", MAX_REDIRECTS),
                };
            }

            tracing::trace!("Redirect {} -> {}", current, next);
            if !self.gate.acquire(cancel).await {
                return Attempt::Cancelled;
            }

            seen.push(next.clone());
            current = next;
        };

        let status = response.status();
        let status_code = Some(status.as_u16());

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Attempt::Transient {
                status_code,
                detail: format!("HTTP {}", status),
            };
        }

        if !status.is_success() {
            return Attempt::Rejected {
                status_code,
                detail: format!("HTTP {}", status),
            };
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return Attempt::Rejected {
                status_code,
                detail: format!("Content-Type '{}' is not HTML", content_type),
            };
        }

        let final_url = response.url().clone();

        match response.text().await {
            Ok(body) => Attempt::Page {
                final_url,
                status_code: status.as_u16(),
                content_type,
                body,
            },
            Err(e) => Attempt::Transient {
                status_code,
                detail: format!("Failed to read body: {}", e),
            },
        }
    }

    fn report(
        &self,
        url: &CanonicalUrl,
        outcome: FetchOutcome,
        attempt_count: u32,
        will_retry: bool,
        status_code: Option<u16>,
        detail: Option<String>,
    ) {
        self.observer.on_fetch_attempt(&FetchEvent {
            url: url.clone(),
            outcome,
            attempt_count,
            will_retry,
            status_code,
            detail,
        });
    }
}

/// Resolves a redirect's Location header against the URL that answered
///
/// Only http(s) targets are followed.
fn redirect_target(current: &Url, response: &reqwest::Response) -> Option<Url> {
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()?;
    let mut next = current.join(location).ok()?;
    next.set_fragment(None);

    matches!(next.scheme(), "http" | "https").then_some(next)
}

/// Classifies a transport-level error
fn classify_error(e: &reqwest::Error) -> Attempt {
    let status_code = e.status().map(|s| s.as_u16());

    if e.is_builder() {
        return Attempt::Rejected {
            status_code,
            detail: e.to_string(),
        };
    }

    let detail = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    };

    Attempt::Transient {
        status_code,
        detail,
    }
}
