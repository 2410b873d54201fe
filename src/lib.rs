//! Sitegraph: a same-domain site structure mapper
//!
//! This crate crawls a website from a seed URL, follows only links that stay on
//! the seed's host, and records the resulting directed graph of pages and links.
//! Out-of-domain targets are recorded as edges but never fetched.

pub mod config;
pub mod crawler;
pub mod graph;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sitegraph operations
#[derive(Debug, Error)]
pub enum SitegraphError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid start URL '{url}': {source}")]
    InvalidSeed { url: String, source: UrlError },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Every variant is a flavour of the `Invalid` canonicalization outcome: the
/// candidate is dropped and never becomes a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Empty URL")]
    Empty,

    #[error("Fragment-only reference: {0}")]
    FragmentOnly(String),
}

/// Errors raised when reading the crawl graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Crawl has not terminated; the graph cannot be snapshotted yet")]
    NotTerminated,
}

/// Result type alias for Sitegraph operations
pub type Result<T> = std::result::Result<T, SitegraphError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlOutcome, CrawlReport};
pub use graph::{CrawlGraph, GraphBuilder, NodeView};
pub use state::{CrawlPhase, PageState};
pub use crate::url::{canonicalize, is_internal, CanonicalUrl};
