//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with pacing and retry logic
//! - HTML parsing and link extraction
//! - The frontier, visited set, and completion detection
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod observer;
mod parser;
mod scheduler;
mod visited;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome, CrawlReport};
pub use fetcher::{
    build_http_client, user_agent_string, FailureKind, FetchFailure, FetchResult, FetchedPage,
    Fetcher, RetryPolicy, MAX_BACKOFF, MAX_REDIRECTS,
};
pub use observer::{CrawlObserver, FetchEvent, FetchOutcome, ObserverRegistry, TracingObserver};
pub use parser::{extract_links, parse_html, ParsedPage};
pub use scheduler::{Frontier, FrontierPop};
pub use visited::VisitedSet;
