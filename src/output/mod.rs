//! Output module for exporting crawl results
//!
//! This module handles:
//! - Deriving a filesystem-safe base name from the start URL
//! - Statistics and links JSON exports
//! - Markdown summaries
//! - SQLite export of the finished graph
//!
//! Everything here reads a finished `CrawlReport`; nothing reaches into the
//! live crawl.

mod json;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use json::{link_records, LinkRecord, LinksJsonOutput, StatsJsonOutput};
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownOutput};
pub use sqlite_output::{export_run, open_database, SqliteOutputHandler, SCHEMA_SQL};
pub use stats::{print_statistics, CrawlStatistics, PageDegree};
pub use traits::{CrawlSummary, OutputError, OutputHandler, OutputResult};

use crate::config::OutputConfig;
use crate::crawler::CrawlReport;
use crate::url::CanonicalUrl;
use std::path::{Path, PathBuf};

/// Derives the file name prefix for a crawl's outputs
///
/// The host with a leading `www.` removed, dots replaced by underscores and
/// colons dropped; `output` if nothing is left.
///
/// # Examples
///
/// ```
/// use sitegraph::output::safe_filename_base;
///
/// let url = "https://www.example.com/docs".parse().unwrap();
/// assert_eq!(safe_filename_base(&url), "example_com");
/// ```
pub fn safe_filename_base(start_url: &CanonicalUrl) -> String {
    let host = start_url.host();
    let host = host.strip_prefix("www.").unwrap_or(host);

    let base: String = host
        .chars()
        .filter(|c| *c != ':')
        .map(|c| match c {
            '.' => '_',
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect();

    if base.is_empty() {
        "output".to_string()
    } else {
        base
    }
}

/// Builds the handlers enabled by `config`
///
/// # Arguments
///
/// * `config` - The output configuration
/// * `base` - File name prefix, usually from `safe_filename_base`
pub fn build_handlers(config: &OutputConfig, base: &str) -> Vec<Box<dyn OutputHandler>> {
    let dir = Path::new(&config.directory);
    let mut handlers: Vec<Box<dyn OutputHandler>> = Vec::new();

    if config.stats {
        handlers.push(Box::new(StatsJsonOutput::new(
            dir.join(format!("{}_stats.json", base)),
        )));
    }
    if config.links {
        handlers.push(Box::new(LinksJsonOutput::new(
            dir.join(format!("{}_links.json", base)),
        )));
    }
    if config.summary {
        handlers.push(Box::new(MarkdownOutput::new(
            dir.join(format!("{}_summary.md", base)),
        )));
    }
    if config.database {
        handlers.push(Box::new(SqliteOutputHandler::new(
            dir.join(format!("{}_graph.db", base)),
        )));
    }

    handlers
}

/// Writes every enabled output for a finished crawl
///
/// Creates the output directory if needed. Stops at the first handler that
/// fails.
///
/// # Arguments
///
/// * `report` - The finished crawl
/// * `config` - Which outputs to write and where
/// * `config_hash` - Hash of the configuration file, if one was used
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths written, in handler order
/// * `Err(OutputError)` - A handler failed
pub fn write_outputs(
    report: &CrawlReport,
    config: &OutputConfig,
    config_hash: Option<&str>,
) -> OutputResult<Vec<PathBuf>> {
    std::fs::create_dir_all(&config.directory)?;

    let summary = CrawlSummary::from_report(report, config_hash);
    let base = safe_filename_base(&report.start_url);

    let mut written = Vec::new();
    for handler in build_handlers(config, &base) {
        let path = handler.write(report, &summary)?;
        tracing::info!("Wrote {} to {}", handler.name(), path.display());
        written.push(path);
    }

    Ok(written)
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::sample_report;
    use tempfile::TempDir;

    fn url(s: &str) -> CanonicalUrl {
        s.parse().unwrap()
    }

    #[test]
    fn test_safe_filename_base() {
        assert_eq!(safe_filename_base(&url("https://example.com/")), "example_com");
        assert_eq!(
            safe_filename_base(&url("https://www.example.co.uk/x")),
            "example_co_uk"
        );
        assert_eq!(
            safe_filename_base(&url("http://blog.example.com/")),
            "blog_example_com"
        );
        assert_eq!(safe_filename_base(&url("http://127.0.0.1:8080/")), "127_0_0_1");
    }

    #[test]
    fn test_safe_filename_base_ipv6() {
        assert_eq!(safe_filename_base(&url("http://[::1]:3000/")), "_1_");
    }

    #[test]
    fn test_build_handlers_respects_flags() {
        let mut config = OutputConfig::default();
        let names: Vec<&str> = build_handlers(&config, "x").iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["stats", "links", "summary"]);

        config.database = true;
        config.summary = false;
        let names: Vec<&str> = build_handlers(&config, "x").iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["stats", "links", "database"]);
    }

    #[test]
    fn test_handler_paths() {
        let config = OutputConfig {
            directory: "out".to_string(),
            database: true,
            ..OutputConfig::default()
        };
        let paths: Vec<PathBuf> = build_handlers(&config, "example_com")
            .iter()
            .map(|h| h.path().to_path_buf())
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/example_com_stats.json"),
                PathBuf::from("out/example_com_links.json"),
                PathBuf::from("out/example_com_summary.md"),
                PathBuf::from("out/example_com_graph.db"),
            ]
        );
    }

    #[test]
    fn test_write_outputs_creates_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("results");
        let config = OutputConfig {
            directory: out.to_string_lossy().into_owned(),
            database: true,
            ..OutputConfig::default()
        };

        let written = write_outputs(&sample_report(), &config, None).unwrap();

        assert_eq!(written.len(), 4);
        for path in &written {
            assert!(path.exists(), "{} should exist", path.display());
        }
        assert!(out.join("example_com_links.json").exists());
    }
}
