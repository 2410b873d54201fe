use crate::graph::snapshot::{CrawlGraph, NodeView};
use crate::state::PageState;
use crate::url::CanonicalUrl;
use crate::GraphError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct NodeRecord {
    /// Outgoing targets in first-seen order
    outgoing: Vec<CanonicalUrl>,
    outgoing_set: HashSet<CanonicalUrl>,
    in_degree: usize,
    status: PageState,
}

impl NodeRecord {
    fn new() -> Self {
        Self {
            outgoing: Vec::new(),
            outgoing_set: HashSet::new(),
            in_degree: 0,
            status: PageState::Discovered,
        }
    }
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: HashMap<CanonicalUrl, NodeRecord>,
    /// Node identities in discovery order
    order: Vec<CanonicalUrl>,
    edge_count: usize,
    sealed: bool,
}

impl GraphInner {
    fn ensure_node(&mut self, url: &CanonicalUrl) -> bool {
        if self.nodes.contains_key(url) {
            return false;
        }
        self.nodes.insert(url.clone(), NodeRecord::new());
        self.order.push(url.clone());
        true
    }

    fn insert_edge(&mut self, source: &CanonicalUrl, target: &CanonicalUrl) -> bool {
        self.ensure_node(source);
        self.ensure_node(target);

        let mut inserted = false;
        if let Some(node) = self.nodes.get_mut(source) {
            if node.outgoing_set.insert(target.clone()) {
                node.outgoing.push(target.clone());
                inserted = true;
            }
        }

        if inserted {
            if let Some(node) = self.nodes.get_mut(target) {
                node.in_degree += 1;
            }
            self.edge_count += 1;
        }
        inserted
    }
}

/// Thread-safe, idempotent builder for the crawl graph
///
/// Every public mutation takes the internal lock once, so a reader never
/// observes a node with only part of its edges recorded.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    inner: Mutex<GraphInner>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Adds a node if absent
    ///
    /// Returns true if this call created the node. Ignored once sealed.
    pub fn add_node(&self, url: &CanonicalUrl) -> bool {
        let mut inner = self.lock();
        if inner.sealed {
            tracing::debug!("Ignoring add_node on sealed graph: {}", url);
            return false;
        }
        inner.ensure_node(url)
    }

    /// Adds a directed edge, creating either endpoint as needed
    ///
    /// Returns true if the edge was new. Repeating the call is a no-op.
    pub fn add_edge(&self, source: &CanonicalUrl, target: &CanonicalUrl) -> bool {
        let mut inner = self.lock();
        if inner.sealed {
            tracing::debug!("Ignoring add_edge on sealed graph: {} -> {}", source, target);
            return false;
        }
        inner.insert_edge(source, target)
    }

    /// Records a fetched page: its status and every outgoing edge in one step
    ///
    /// # Arguments
    ///
    /// * `source` - The page that was fetched
    /// * `status` - The page's final fetch status
    /// * `targets` - Canonical link targets observed on the page, in order
    ///
    /// # Returns
    ///
    /// The number of edges that were new
    pub fn record_page(
        &self,
        source: &CanonicalUrl,
        status: PageState,
        targets: &[CanonicalUrl],
    ) -> usize {
        let mut inner = self.lock();
        if inner.sealed {
            tracing::debug!("Ignoring record_page on sealed graph: {}", source);
            return 0;
        }

        inner.ensure_node(source);
        if let Some(node) = inner.nodes.get_mut(source) {
            node.status = status;
        }

        targets
            .iter()
            .filter(|target| inner.insert_edge(source, target))
            .count()
    }

    /// Freezes the graph; later mutations are ignored
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edge_count
    }

    /// Returns an immutable copy of the finished graph
    ///
    /// # Errors
    ///
    /// `GraphError::NotTerminated` if the graph has not been sealed yet.
    pub fn snapshot(&self) -> Result<CrawlGraph, GraphError> {
        let inner = self.lock();
        if !inner.sealed {
            return Err(GraphError::NotTerminated);
        }

        let nodes = inner
            .order
            .iter()
            .filter_map(|url| {
                inner.nodes.get(url).map(|record| NodeView {
                    url: url.clone(),
                    in_degree: record.in_degree,
                    out_degree: record.outgoing.len(),
                    outgoing_urls: record.outgoing.clone(),
                    status: record.status,
                })
            })
            .collect();

        Ok(CrawlGraph::from_nodes(nodes))
    }
}
