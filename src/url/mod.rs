//! URL handling module for Sitegraph
//!
//! This module provides URL canonicalization and the
//! internal/external scope decision that gates what enters the frontier.

mod domain;
mod normalize;

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

// Re-export main functions
pub use domain::is_internal;
pub use normalize::canonicalize;

/// A normalized absolute http(s) URL used as node identity
///
/// Values can only be produced by [`canonicalize`], so two `CanonicalUrl`s
/// compare equal exactly when their string forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub(crate) fn from_normalized(url: Url) -> Self {
        Self(url)
    }

    /// Returns the canonical string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the lower-cased host (always present for canonical URLs)
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for CanonicalUrl {
    type Err = crate::UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        canonicalize(s, None)
    }
}

impl Serialize for CanonicalUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Where a discovered link points relative to the seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same host as the seed - eligible for the frontier
    Internal,
    /// Any other host - recorded as an edge target only
    External,
}

impl LinkScope {
    /// Classifies a canonical URL against the seed host
    ///
    /// # Examples
    ///
    /// ```
    /// use sitegraph::url::{canonicalize, LinkScope};
    ///
    /// let url = canonicalize("https://example.com/about", None).unwrap();
    /// assert_eq!(LinkScope::classify(&url, "example.com"), LinkScope::Internal);
    /// assert_eq!(LinkScope::classify(&url, "blog.example.com"), LinkScope::External);
    /// ```
    pub fn classify(url: &CanonicalUrl, seed_host: &str) -> Self {
        if is_internal(url, seed_host) {
            Self::Internal
        } else {
            Self::External
        }
    }

    /// Returns true if URLs in this scope may be fetched
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Internal)
    }
}
