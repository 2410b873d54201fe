//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl lifecycle that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the frontier with the canonical start URL
//! - Running a fixed pool of worker tasks over the shared frontier
//! - Coordinating fetching, parsing, and link extraction
//! - Recording every observed edge in the graph
//! - Detecting completion and honouring cancellation

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, FailureKind, FetchResult, Fetcher, RetryPolicy};
use crate::crawler::observer::{CrawlObserver, ObserverRegistry};
use crate::crawler::parser::parse_html;
use crate::crawler::scheduler::{Frontier, FrontierPop};
use crate::crawler::visited::VisitedSet;
use crate::graph::{CrawlGraph, GraphBuilder};
use crate::state::{CrawlPhase, PageState, RateGate};
use crate::url::{canonicalize, CanonicalUrl, LinkScope};
use crate::{GraphError, SitegraphError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlOutcome {
    /// The frontier drained naturally
    Completed,

    /// The stop signal fired first; the graph is a consistent partial graph
    Cancelled,
}

impl CrawlOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a finished crawl hands to downstream consumers
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub start_url: CanonicalUrl,
    pub graph: CrawlGraph,
    pub outcome: CrawlOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Pages fetched successfully and parsed
    pub pages_fetched: usize,
    /// Pages that ended rejected or unreachable
    pub pages_failed: usize,
}

impl CrawlReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == CrawlOutcome::Completed
    }
}

/// State shared by every worker of one crawl
struct CrawlState {
    seed_host: String,
    frontier: Frontier,
    visited: VisitedSet,
    graph: GraphBuilder,
    fetcher: Fetcher,
    observer: Arc<dyn CrawlObserver>,
    phase: Mutex<CrawlPhase>,
    cancel: CancellationToken,
    pages_fetched: AtomicUsize,
    pages_failed: AtomicUsize,
    started: Instant,
}

impl CrawlState {
    fn phase(&self) -> CrawlPhase {
        match self.phase.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Moves to `next` if legal from the current phase
    fn advance(&self, next: CrawlPhase) -> Result<(), SitegraphError> {
        let mut phase = match self.phase.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !phase.can_transition_to(next) {
            return Err(SitegraphError::InvalidTransition {
                from: *phase,
                to: next,
            });
        }

        tracing::debug!("Crawl phase {} -> {}", *phase, next);
        *phase = next;
        Ok(())
    }

    /// Moves from `from` to `to` only if the crawl is currently in `from`
    ///
    /// Check and move happen under one lock. Returns whether it moved.
    fn advance_if(&self, from: CrawlPhase, to: CrawlPhase) -> bool {
        let mut phase = match self.phase.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if *phase != from || !from.can_transition_to(to) {
            return false;
        }

        tracing::debug!("Crawl phase {} -> {}", from, to);
        *phase = to;
        true
    }

    /// Claims an internal URL and queues it; external URLs are never queued
    fn enqueue(&self, url: &CanonicalUrl) -> bool {
        if !LinkScope::classify(url, &self.seed_host).should_crawl() {
            tracing::trace!("Not following external {}", url);
            return false;
        }
        if !self.visited.claim(url) {
            return false;
        }
        if !self.frontier.push(url.clone()) {
            return false;
        }
        self.observer.on_url_queued(url);
        true
    }

    /// Fetches one claimed URL and records the result
    ///
    /// Returns false if the stop signal interrupted the fetch; nothing is
    /// recorded for that URL in that case.
    async fn process(&self, url: &CanonicalUrl) -> bool {
        let page = match self.fetcher.fetch(url, &self.cancel).await {
            FetchResult::Success(page) => page,
            FetchResult::Failure(failure) => {
                let status = match failure.kind {
                    FailureKind::Rejected => PageState::Rejected,
                    FailureKind::Unreachable => PageState::Unreachable,
                };
                self.graph.record_page(url, status, &[]);
                self.pages_failed.fetch_add(1, Ordering::Relaxed);
                self.observer.on_page_recorded(url, status, 0);
                return true;
            }
            FetchResult::Cancelled => {
                tracing::debug!("Fetch of {} abandoned on cancellation", url);
                return false;
            }
        };

        let parsed = parse_html(&page.body, &page.final_url);
        if let Some(title) = &parsed.title {
            tracing::debug!("{} - {}", url, title);
        }

        let targets: Vec<CanonicalUrl> = parsed
            .links
            .iter()
            .filter_map(|href| match canonicalize(href, Some(&parsed.base)) {
                Ok(target) => Some(target),
                Err(e) => {
                    tracing::trace!("Dropping link '{}' on {}: {}", href, url, e);
                    None
                }
            })
            .collect();

        // Status and edges land together, before any target is queued.
        let new_edges = self.graph.record_page(url, PageState::Fetched, &targets);
        self.observer
            .on_page_recorded(url, PageState::Fetched, new_edges);

        let queued = targets.iter().filter(|target| self.enqueue(target)).count();
        tracing::debug!(
            "{}: {} links, {} new edges, {} queued",
            url,
            targets.len(),
            new_edges,
            queued
        );

        let fetched = self.pages_fetched.fetch_add(1, Ordering::Relaxed) + 1;
        if fetched % 10 == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                fetched as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Progress: {} pages fetched, {} in frontier, {} in flight, {:.2} pages/sec",
                fetched,
                self.frontier.len(),
                self.frontier.in_flight(),
                rate
            );
        }

        true
    }
}

/// One worker: pop, process, complete, until there is nothing left
async fn worker_loop(id: usize, state: Arc<CrawlState>) {
    tracing::debug!("Worker {} started", id);

    loop {
        let url = match state.frontier.pop(&state.cancel).await {
            FrontierPop::Task(url) => url,
            FrontierPop::Exhausted => {
                state.advance_if(CrawlPhase::Running, CrawlPhase::Draining);
                break;
            }
            FrontierPop::Cancelled => break,
        };

        if !state.process(&url).await {
            break;
        }
        state.frontier.complete();
    }

    tracing::debug!("Worker {} stopped", id);
}

/// Main crawler coordinator structure
///
/// Construction performs the seeding phase; `run` drives the crawl to its
/// terminal phase exactly once.
pub struct Coordinator {
    state: Arc<CrawlState>,
    start_url: CanonicalUrl,
    max_workers: usize,
    crawl_timeout: Option<Duration>,
}

impl Coordinator {
    /// Creates a new coordinator that logs events through `tracing`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration; validated before anything else
    /// * `start_url` - The seed URL; must canonicalize successfully
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Seeded and ready to run
    /// * `Err(SitegraphError)` - Invalid config, invalid seed or HTTP client failure
    pub fn new(config: &Config, start_url: &str) -> Result<Self, SitegraphError> {
        Self::with_registry(config, start_url, ObserverRegistry::with_tracing())
    }

    /// Creates a new coordinator that also reports events to `observer`
    ///
    /// Events are still logged through `tracing`.
    pub fn with_observer(
        config: &Config,
        start_url: &str,
        observer: Arc<dyn CrawlObserver>,
    ) -> Result<Self, SitegraphError> {
        let mut registry = ObserverRegistry::with_tracing();
        registry.register(observer);
        Self::with_registry(config, start_url, registry)
    }

    fn with_registry(
        config: &Config,
        start_url: &str,
        registry: ObserverRegistry,
    ) -> Result<Self, SitegraphError> {
        validate(config)?;
        let observer: Arc<dyn CrawlObserver> = Arc::new(registry);

        let start = canonicalize(start_url, None).map_err(|source| SitegraphError::InvalidSeed {
            url: start_url.to_string(),
            source,
        })?;

        let crawler = &config.crawler;
        let client = build_http_client(&config.user_agent, crawler.request_timeout_duration())?;
        let gate = Arc::new(RateGate::from_secs_f64(crawler.rate_limit));
        let fetcher = Fetcher::new(
            client,
            gate,
            RetryPolicy::from_config(crawler),
            Arc::clone(&observer),
        );

        let state = Arc::new(CrawlState {
            seed_host: start.host().to_string(),
            frontier: Frontier::new(),
            visited: VisitedSet::new(),
            graph: GraphBuilder::new(),
            fetcher,
            observer,
            phase: Mutex::new(CrawlPhase::Seeding),
            cancel: CancellationToken::new(),
            pages_fetched: AtomicUsize::new(0),
            pages_failed: AtomicUsize::new(0),
            started: Instant::now(),
        });

        state.graph.add_node(&start);
        state.enqueue(&start);

        tracing::info!(
            "Seeded crawl of {} (host {}, {} workers, {:.2}s pacing, {} retries)",
            start,
            state.seed_host,
            crawler.max_workers,
            crawler.rate_limit,
            crawler.max_retries
        );

        Ok(Self {
            state,
            start_url: start,
            max_workers: crawler.max_workers,
            crawl_timeout: crawler.crawl_timeout_duration(),
        })
    }

    /// Token that stops the crawl when cancelled
    ///
    /// Cancelling it is how callers implement user interrupts; the crawl
    /// then returns a report with `CrawlOutcome::Cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.state.cancel.clone()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.state.phase()
    }

    pub fn start_url(&self) -> &CanonicalUrl {
        &self.start_url
    }

    /// Returns the graph once the crawl has terminated
    pub fn snapshot(&self) -> Result<CrawlGraph, GraphError> {
        if !self.phase().is_terminal() {
            return Err(GraphError::NotTerminated);
        }
        self.state.graph.snapshot()
    }

    /// Runs the crawl to completion or cancellation
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl terminated, possibly cancelled
    /// * `Err(SitegraphError)` - `run` was called twice, or a worker panicked
    pub async fn run(&self) -> Result<CrawlReport, SitegraphError> {
        self.state.advance(CrawlPhase::Running)?;
        let started_at = Utc::now();

        tracing::info!("Starting crawl of {}", self.start_url);

        let deadline = self.crawl_timeout.map(|timeout| {
            let cancel = self.state.cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        tracing::warn!("Crawl timeout of {:?} reached, stopping", timeout);
                        cancel.cancel();
                    }
                }
            })
        });

        let mut workers = JoinSet::new();
        for id in 0..self.max_workers {
            workers.spawn(worker_loop(id, Arc::clone(&self.state)));
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                self.state.cancel.cancel();
                failure.get_or_insert(e);
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let outcome = if self.state.frontier.is_closed() {
            CrawlOutcome::Completed
        } else {
            CrawlOutcome::Cancelled
        };

        self.state.graph.seal();
        self.state.advance(CrawlPhase::Terminated)?;

        if let Some(e) = failure {
            return Err(SitegraphError::Worker(e));
        }

        let graph = self.state.graph.snapshot()?;
        let report = CrawlReport {
            start_url: self.start_url.clone(),
            outcome,
            started_at,
            finished_at: Utc::now(),
            pages_fetched: self.state.pages_fetched.load(Ordering::Relaxed),
            pages_failed: self.state.pages_failed.load(Ordering::Relaxed),
            graph,
        };

        self.state
            .observer
            .on_crawl_finished(outcome, report.graph.node_count(), report.graph.edge_count());
        tracing::info!(
            "Crawl {} in {:?}: {} fetched, {} failed",
            outcome,
            self.state.started.elapsed(),
            report.pages_fetched,
            report.pages_failed
        );

        Ok(report)
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Canonicalize and seed the start URL
/// 2. Build the HTTP client and pacing gate
/// 3. Fetch pages with a bounded worker pool
/// 4. Extract links and follow the in-domain ones
/// 5. Return the finished graph
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `start_url` - The seed URL
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl terminated
/// * `Err(SitegraphError)` - The seed was invalid or the crawl could not start
pub async fn run_crawl(config: &Config, start_url: &str) -> Result<CrawlReport, SitegraphError> {
    Coordinator::new(config, start_url)?.run().await
}
