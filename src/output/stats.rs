//! Statistics generation from the crawl graph
//!
//! This module derives summary numbers from a finished `CrawlGraph` and
//! prints them for the terminal.

use crate::graph::{CrawlGraph, NodeView};
use crate::state::PageState;
use crate::url::{is_internal, CanonicalUrl};
use serde::Serialize;

/// How many pages the "top" lists keep
pub const TOP_PAGES: usize = 10;

/// A page and one of its degrees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageDegree {
    pub url: String,
    pub degree: usize,
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStatistics {
    /// Total number of nodes in the graph
    pub nodes: usize,

    /// Total number of distinct edges
    pub edges: usize,

    /// Nodes on the seed host
    pub internal_nodes: usize,

    /// Nodes on any other host; recorded but never fetched
    pub external_nodes: usize,

    /// Pages fetched and parsed
    pub fetched: usize,

    /// Pages rejected without retry
    pub rejected: usize,

    /// Pages that exhausted their retries
    pub unreachable: usize,

    /// Nodes that never had a fetch concluded
    pub never_fetched: usize,

    /// Mean out-degree over fetched pages
    pub average_out_degree: f64,

    /// Most linked-to pages
    pub top_by_in_degree: Vec<PageDegree>,

    /// Pages with the most outgoing links
    pub top_by_out_degree: Vec<PageDegree>,
}

impl CrawlStatistics {
    /// Computes statistics for a finished graph
    ///
    /// # Arguments
    ///
    /// * `graph` - The crawl graph snapshot
    /// * `start_url` - The seed; its host decides internal vs external
    pub fn from_graph(graph: &CrawlGraph, start_url: &CanonicalUrl) -> Self {
        let seed_host = start_url.host();

        let internal_nodes = graph
            .nodes()
            .iter()
            .filter(|n| is_internal(&n.url, seed_host))
            .count();

        let fetched = graph.count_with_status(PageState::Fetched);
        let fetched_out: usize = graph
            .nodes()
            .iter()
            .filter(|n| n.status == PageState::Fetched)
            .map(|n| n.out_degree)
            .sum();
        let average_out_degree = if fetched > 0 {
            fetched_out as f64 / fetched as f64
        } else {
            0.0
        };

        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            internal_nodes,
            external_nodes: graph.node_count() - internal_nodes,
            fetched,
            rejected: graph.count_with_status(PageState::Rejected),
            unreachable: graph.count_with_status(PageState::Unreachable),
            never_fetched: graph.count_with_status(PageState::Discovered),
            average_out_degree,
            top_by_in_degree: top_pages(graph, |n| n.in_degree),
            top_by_out_degree: top_pages(graph, |n| n.out_degree),
        }
    }
}

/// Highest-degree pages, ties broken by URL; zero-degree pages are skipped
fn top_pages(graph: &CrawlGraph, degree: impl Fn(&NodeView) -> usize) -> Vec<PageDegree> {
    let mut pages: Vec<PageDegree> = graph
        .nodes()
        .iter()
        .map(|n| PageDegree {
            url: n.url.to_string(),
            degree: degree(n),
        })
        .filter(|p| p.degree > 0)
        .collect();

    pages.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.url.cmp(&b.url)));
    pages.truncate(TOP_PAGES);
    pages
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Nodes: {}", stats.nodes);
    println!("  Edges: {}", stats.edges);
    println!("  Internal pages: {}", stats.internal_nodes);
    println!("  External links: {}", stats.external_nodes);
    println!();

    println!("Pages by Status:");
    for (label, count) in [
        ("Fetched", stats.fetched),
        ("Rejected", stats.rejected),
        ("Unreachable", stats.unreachable),
        ("Never fetched", stats.never_fetched),
    ] {
        let percentage = if stats.nodes > 0 {
            (count as f64 / stats.nodes as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !stats.top_by_in_degree.is_empty() {
        println!("Most Linked Pages:");
        for page in &stats.top_by_in_degree {
            println!("  {:>5}  {}", page.degree, page.url);
        }
        println!();
    }

    println!(
        "Average outgoing links per fetched page: {:.2}",
        stats.average_out_degree
    );
}
