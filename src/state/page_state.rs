/// Page state definitions for graph nodes
///
/// This module defines the fetch status tag every node carries.
use serde::Serialize;
use std::fmt;

/// Represents what is known about a node's own fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// Referenced as a link target (or seeded) but not fetched
    Discovered,

    /// Fetched successfully and its links recorded
    Fetched,

    /// Non-retryable outcome (4xx, non-HTML content)
    Rejected,

    /// Retry budget exhausted on transient failures
    Unreachable,
}

impl PageState {
    /// Converts the page state to its export string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Fetched => "fetched",
            Self::Rejected => "rejected",
            Self::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
