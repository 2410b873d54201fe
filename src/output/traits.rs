//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and
//! the crawl summary every handler receives.

use crate::crawler::CrawlReport;
use crate::output::stats::CrawlStatistics;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Run metadata plus graph statistics for one finished crawl
///
/// Serialized as-is into the stats JSON file.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    // Run metadata
    pub start_url: String,
    pub outcome: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    #[serde(flatten)]
    pub statistics: CrawlStatistics,
}

impl CrawlSummary {
    /// Builds a summary from a finished crawl
    ///
    /// # Arguments
    ///
    /// * `report` - The crawl report
    /// * `config_hash` - Hash of the configuration file, if one was used
    pub fn from_report(report: &CrawlReport, config_hash: Option<&str>) -> Self {
        let duration_seconds = report
            .duration()
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            start_url: report.start_url.to_string(),
            outcome: report.outcome.to_string(),
            started_at: report.started_at.to_rfc3339(),
            finished_at: report.finished_at.to_rfc3339(),
            duration_seconds,
            config_hash: config_hash.map(str::to_string),
            statistics: CrawlStatistics::from_graph(&report.graph, &report.start_url),
        }
    }

    /// Pages whose fetch concluded, successfully or not
    pub fn total_attempted_pages(&self) -> usize {
        self.statistics.fetched + self.statistics.rejected + self.statistics.unreachable
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total_attempted_pages();
        if attempted == 0 {
            return 0.0;
        }
        (self.statistics.fetched as f64 / attempted as f64) * 100.0
    }

    /// Returns the error rate as a percentage
    pub fn error_rate(&self) -> f64 {
        let attempted = self.total_attempted_pages();
        if attempted == 0 {
            return 0.0;
        }
        ((self.statistics.rejected + self.statistics.unreachable) as f64 / attempted as f64)
            * 100.0
    }
}

/// Trait for output handlers
///
/// Each handler turns one finished crawl into one artifact. Handlers only
/// read the report; they never see the live crawl.
pub trait OutputHandler {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Where the artifact is written
    fn path(&self) -> &Path;

    /// Writes the artifact
    ///
    /// # Arguments
    ///
    /// * `report` - The finished crawl
    /// * `summary` - Summary derived from `report`
    ///
    /// # Returns
    ///
    /// The path that was written
    fn write(&self, report: &CrawlReport, summary: &CrawlSummary) -> OutputResult<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::sample_report;

    #[test]
    fn test_summary_from_report() {
        let report = sample_report();
        let summary = CrawlSummary::from_report(&report, Some("abc123"));

        assert_eq!(summary.start_url, "https://example.com/");
        assert_eq!(summary.outcome, "completed");
        assert_eq!(summary.config_hash.as_deref(), Some("abc123"));
        assert_eq!(summary.statistics.nodes, 4);
        assert_eq!(summary.statistics.edges, 4);
        assert!(summary.duration_seconds >= 0.0);
    }

    #[test]
    fn test_success_and_error_rate() {
        let summary = CrawlSummary::from_report(&sample_report(), None);

        // Two fetched, one unreachable
        assert_eq!(summary.total_attempted_pages(), 3);
        assert!((summary.success_rate() - 66.666).abs() < 0.01);
        assert!((summary.error_rate() - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_rates_with_no_pages() {
        let mut summary = CrawlSummary::from_report(&sample_report(), None);
        summary.statistics.fetched = 0;
        summary.statistics.rejected = 0;
        summary.statistics.unreachable = 0;

        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(summary.error_rate(), 0.0);
    }

    #[test]
    fn test_serialized_summary_is_flat() {
        let summary = CrawlSummary::from_report(&sample_report(), None);
        let value = serde_json::to_value(&summary).unwrap();

        assert_eq!(value["nodes"], 4);
        assert_eq!(value["edges"], 4);
        assert_eq!(value["start_url"], "https://example.com/");
        assert!(value.get("config_hash").is_none());
        assert!(value.get("statistics").is_none());
    }
}
