use crate::state::PageState;
use crate::url::CanonicalUrl;
use serde::Serialize;
use std::collections::HashMap;

/// A read-only view of one node in the finished graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub url: CanonicalUrl,
    pub in_degree: usize,
    pub out_degree: usize,
    /// Outgoing targets in first-seen order, without duplicates
    pub outgoing_urls: Vec<CanonicalUrl>,
    pub status: PageState,
}

/// A directed edge: `source` links to `target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: CanonicalUrl,
    pub target: CanonicalUrl,
}

/// Immutable snapshot of a terminated crawl
///
/// This is the only interface exporters rely on. Nodes are listed in
/// discovery order, which carries no meaning beyond being stable for a given
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct CrawlGraph {
    nodes: Vec<NodeView>,
    index: HashMap<CanonicalUrl, usize>,
    edges: Vec<Edge>,
}

impl CrawlGraph {
    pub(crate) fn from_nodes(nodes: Vec<NodeView>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.url.clone(), i))
            .collect();

        let edges = nodes
            .iter()
            .flat_map(|node| {
                node.outgoing_urls.iter().map(move |target| Edge {
                    source: node.url.clone(),
                    target: target.clone(),
                })
            })
            .collect();

        Self {
            nodes,
            index,
            edges,
        }
    }

    pub fn nodes(&self) -> &[NodeView] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, url: &CanonicalUrl) -> Option<&NodeView> {
        self.index.get(url).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.index.contains_key(url)
    }

    pub fn has_edge(&self, source: &CanonicalUrl, target: &CanonicalUrl) -> bool {
        self.node(source)
            .map(|node| node.outgoing_urls.contains(target))
            .unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counts nodes carrying the given status
    pub fn count_with_status(&self, status: PageState) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }

    /// Checks that every node's degrees agree with the edge list
    pub fn degrees_consistent(&self) -> bool {
        let mut out: HashMap<&CanonicalUrl, usize> = HashMap::new();
        let mut inc: HashMap<&CanonicalUrl, usize> = HashMap::new();
        for edge in &self.edges {
            *out.entry(&edge.source).or_default() += 1;
            *inc.entry(&edge.target).or_default() += 1;
        }

        self.nodes.iter().all(|node| {
            node.out_degree == out.get(&node.url).copied().unwrap_or(0)
                && node.in_degree == inc.get(&node.url).copied().unwrap_or(0)
        })
    }
}
