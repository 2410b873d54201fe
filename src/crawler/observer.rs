//! Crawl event observation
//!
//! The engine never formats or persists events itself. It hands them to a
//! `CrawlObserver`; the default `TracingObserver` turns them into log records.

use crate::crawler::coordinator::CrawlOutcome;
use crate::state::PageState;
use crate::url::CanonicalUrl;
use std::fmt;
use std::sync::Arc;

/// Outcome of a single fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOutcome {
    Success,
    Unreachable,
    Rejected,
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Unreachable => "unreachable",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// One fetch attempt, reported whether it succeeded or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEvent {
    pub url: CanonicalUrl,
    pub outcome: FetchOutcome,
    /// 1-based attempt number for this URL
    pub attempt_count: u32,
    /// True when a transient failure will be retried
    pub will_retry: bool,
    pub status_code: Option<u16>,
    pub detail: Option<String>,
}

/// Receives crawl events
///
/// All methods have empty defaults so implementors only override what they
/// need. Calls happen on worker tasks and must not block.
pub trait CrawlObserver: Send + Sync {
    /// A newly claimed internal URL was pushed to the frontier
    fn on_url_queued(&self, _url: &CanonicalUrl) {}

    /// A fetch attempt finished
    fn on_fetch_attempt(&self, _event: &FetchEvent) {}

    /// A page's final status and outgoing links were written to the graph
    fn on_page_recorded(&self, _url: &CanonicalUrl, _status: PageState, _new_edges: usize) {}

    /// The crawl reached its terminal phase
    fn on_crawl_finished(&self, _outcome: CrawlOutcome, _nodes: usize, _edges: usize) {}
}

/// Default observer that logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_url_queued(&self, url: &CanonicalUrl) {
        tracing::trace!("Queued {}", url);
    }

    fn on_fetch_attempt(&self, event: &FetchEvent) {
        let status = event
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let detail = event.detail.as_deref().unwrap_or("");

        match event.outcome {
            FetchOutcome::Success => tracing::debug!(
                "Fetched {} (status {}, attempt {})",
                event.url,
                status,
                event.attempt_count
            ),
            FetchOutcome::Unreachable if event.will_retry => tracing::debug!(
                "Attempt {} for {} failed (status {}): {}; retrying",
                event.attempt_count,
                event.url,
                status,
                detail
            ),
            outcome => tracing::warn!(
                "Fetch {} for {} after {} attempt(s) (status {}): {}",
                outcome,
                event.url,
                event.attempt_count,
                status,
                detail
            ),
        }
    }

    fn on_page_recorded(&self, url: &CanonicalUrl, status: PageState, new_edges: usize) {
        tracing::trace!("Recorded {} as {} with {} new edge(s)", url, status, new_edges);
    }

    fn on_crawl_finished(&self, outcome: CrawlOutcome, nodes: usize, edges: usize) {
        tracing::info!(
            "Crawl {}: {} nodes, {} edges",
            outcome,
            nodes,
            edges
        );
    }
}

/// Fans events out to several observers in registration order
#[derive(Default, Clone)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that starts with a `TracingObserver`
    pub fn with_tracing() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TracingObserver));
        registry
    }

    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CrawlObserver for ObserverRegistry {
    fn on_url_queued(&self, url: &CanonicalUrl) {
        for observer in &self.observers {
            observer.on_url_queued(url);
        }
    }

    fn on_fetch_attempt(&self, event: &FetchEvent) {
        for observer in &self.observers {
            observer.on_fetch_attempt(event);
        }
    }

    fn on_page_recorded(&self, url: &CanonicalUrl, status: PageState, new_edges: usize) {
        for observer in &self.observers {
            observer.on_page_recorded(url, status, new_edges);
        }
    }

    fn on_crawl_finished(&self, outcome: CrawlOutcome, nodes: usize, edges: usize) {
        for observer in &self.observers {
            observer.on_crawl_finished(outcome, nodes, edges);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        attempts: Mutex<Vec<FetchEvent>>,
        queued: Mutex<Vec<CanonicalUrl>>,
    }

    impl CrawlObserver for Collecting {
        fn on_url_queued(&self, url: &CanonicalUrl) {
            self.queued.lock().unwrap().push(url.clone());
        }

        fn on_fetch_attempt(&self, event: &FetchEvent) {
            self.attempts.lock().unwrap().push(event.clone());
        }
    }

    fn event(outcome: FetchOutcome) -> FetchEvent {
        FetchEvent {
            url: "https://example.com/".parse().unwrap(),
            outcome,
            attempt_count: 1,
            will_retry: false,
            status_code: Some(200),
            detail: None,
        }
    }

    #[test]
    fn test_registry_fans_out() {
        let first = Arc::new(Collecting::default());
        let second = Arc::new(Collecting::default());

        let mut registry = ObserverRegistry::new();
        registry.register(first.clone());
        registry.register(second.clone());
        assert_eq!(registry.len(), 2);

        registry.on_fetch_attempt(&event(FetchOutcome::Success));
        registry.on_url_queued(&"https://example.com/a".parse().unwrap());

        assert_eq!(first.attempts.lock().unwrap().len(), 1);
        assert_eq!(second.attempts.lock().unwrap().len(), 1);
        assert_eq!(second.queued.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_with_tracing_keeps_added_observers() {
        let extra = Arc::new(Collecting::default());

        let mut registry = ObserverRegistry::with_tracing();
        assert_eq!(registry.len(), 1);
        registry.register(extra.clone());

        registry.on_fetch_attempt(&event(FetchOutcome::Unreachable));
        assert_eq!(extra.attempts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct Silent;
        impl CrawlObserver for Silent {}

        let silent = Silent;
        silent.on_fetch_attempt(&event(FetchOutcome::Rejected));
        silent.on_crawl_finished(CrawlOutcome::Completed, 0, 0);
    }

    #[test]
    fn test_tracing_observer_handles_all_outcomes() {
        let observer = TracingObserver;
        for outcome in [
            FetchOutcome::Success,
            FetchOutcome::Unreachable,
            FetchOutcome::Rejected,
        ] {
            observer.on_fetch_attempt(&event(outcome));
        }
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(FetchOutcome::Unreachable.to_string(), "unreachable");
    }
}
