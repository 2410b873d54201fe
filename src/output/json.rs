//! JSON exports of the crawl graph
//!
//! - `<base>_stats.json`: run metadata and statistics
//! - `<base>_links.json`: every node with its degrees and outgoing links

use crate::crawler::CrawlReport;
use crate::graph::CrawlGraph;
use crate::output::traits::{CrawlSummary, OutputHandler, OutputResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One entry of the links export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub url: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub outgoing_links: Vec<String>,
}

/// Builds the links export, most outgoing links first
///
/// Ties are ordered by URL so the file is stable across runs with the same
/// graph.
pub fn link_records(graph: &CrawlGraph) -> Vec<LinkRecord> {
    let mut records: Vec<LinkRecord> = graph
        .nodes()
        .iter()
        .map(|node| LinkRecord {
            url: node.url.to_string(),
            in_degree: node.in_degree,
            out_degree: node.out_degree,
            outgoing_links: node.outgoing_urls.iter().map(|u| u.to_string()).collect(),
        })
        .collect();

    records.sort_by(|a, b| {
        b.out_degree
            .cmp(&a.out_degree)
            .then_with(|| a.url.cmp(&b.url))
    });
    records
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `<base>_stats.json`
#[derive(Debug, Clone)]
pub struct StatsJsonOutput {
    path: PathBuf,
}

impl StatsJsonOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for StatsJsonOutput {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, _report: &CrawlReport, summary: &CrawlSummary) -> OutputResult<PathBuf> {
        write_json(&self.path, summary)?;
        Ok(self.path.clone())
    }
}

/// Writes `<base>_links.json`
#[derive(Debug, Clone)]
pub struct LinksJsonOutput {
    path: PathBuf,
}

impl LinksJsonOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for LinksJsonOutput {
    fn name(&self) -> &'static str {
        "links"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, report: &CrawlReport, _summary: &CrawlSummary) -> OutputResult<PathBuf> {
        write_json(&self.path, &link_records(&report.graph))?;
        Ok(self.path.clone())
    }
}
