//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results,
//! including statistics, failure counts, and the most linked pages.

use crate::crawler::CrawlReport;
use crate::output::traits::{CrawlSummary, OutputHandler, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generates a markdown summary from crawl statistics
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
///
/// # Arguments
///
/// * `summary` - The crawl summary data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.statistics;
    let mut md = String::new();

    // Title
    md.push_str("# Sitegraph Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", summary.start_url));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
        summary.duration_seconds,
        summary.duration_seconds / 60.0
    ));
    md.push_str(&format!("- **Outcome**: {}\n", summary.outcome));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    if summary.outcome == "cancelled" {
        md.push_str("> The crawl was stopped early. The graph below covers only the pages processed before the stop.\n\n");
    }

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Nodes**: {}\n", stats.nodes));
    md.push_str(&format!("- **Edges**: {}\n", stats.edges));
    md.push_str(&format!("- **Internal Pages**: {}\n", stats.internal_nodes));
    md.push_str(&format!("- **External Targets**: {}\n", stats.external_nodes));
    md.push_str(&format!(
        "- **Average Outgoing Links**: {:.2}\n",
        stats.average_out_degree
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!(
        "- **Error Rate**: {:.2}%\n\n",
        summary.error_rate()
    ));

    // Status breakdown
    md.push_str("## Page Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Fetched | {} |\n", stats.fetched));
    md.push_str(&format!("| Rejected | {} |\n", stats.rejected));
    md.push_str(&format!("| Unreachable | {} |\n", stats.unreachable));
    md.push_str(&format!("| Never Fetched | {} |\n\n", stats.never_fetched));

    if !stats.top_by_in_degree.is_empty() {
        md.push_str(&format!(
            "## Top {} Most Linked Pages\n\n",
            stats.top_by_in_degree.len()
        ));
        md.push_str("| URL | Incoming Links |\n");
        md.push_str("|-----|----------------|\n");
        for page in &stats.top_by_in_degree {
            md.push_str(&format!("| {} | {} |\n", page.url, page.degree));
        }
        md.push('\n');
    }

    if !stats.top_by_out_degree.is_empty() {
        md.push_str(&format!(
            "## Top {} Pages by Outgoing Links\n\n",
            stats.top_by_out_degree.len()
        ));
        md.push_str("| URL | Outgoing Links |\n");
        md.push_str("|-----|----------------|\n");
        for page in &stats.top_by_out_degree {
            md.push_str(&format!("| {} | {} |\n", page.url, page.degree));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by Sitegraph*\n");

    md
}

/// Writes `<base>_summary.md`
#[derive(Debug, Clone)]
pub struct MarkdownOutput {
    path: PathBuf,
}

impl MarkdownOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for MarkdownOutput {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, _report: &CrawlReport, summary: &CrawlSummary) -> OutputResult<PathBuf> {
        generate_markdown_summary(summary, &self.path)?;
        Ok(self.path.clone())
    }
}
