//! The crawl frontier
//!
//! This module handles:
//! - FIFO queue of claimed URLs awaiting a fetch
//! - The in-flight counter of URLs popped but not yet finished
//! - Blocking pop that waits for new discoveries instead of polling
//! - Completion detection (queue empty and nothing in flight)

use crate::url::CanonicalUrl;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What a worker gets back from `Frontier::pop`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierPop {
    /// A URL to process; the caller must call `complete` when done
    Task(CanonicalUrl),

    /// Queue empty and nothing in flight; no more work will ever arrive
    Exhausted,

    /// The stop signal fired while waiting
    Cancelled,
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<CanonicalUrl>,
    in_flight: usize,
    closed: bool,
}

/// Concurrent FIFO work queue with completion detection
///
/// Queue length and in-flight count change under the same lock, so the
/// "empty and idle" check can never observe a URL moving between the two.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Appends a URL without blocking
    ///
    /// Returns false if the frontier has already been closed.
    pub fn push(&self, url: CanonicalUrl) -> bool {
        {
            let mut inner = self.lock();
            if inner.closed {
                return false;
            }
            inner.queue.push_back(url);
        }
        self.notify.notify_one();
        true
    }

    /// Takes the next URL, waiting while other workers may still add work
    ///
    /// A returned `Task` counts as in flight until `complete` is called.
    pub async fn pop(&self, cancel: &CancellationToken) -> FrontierPop {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking so a push between the check
            // and the await is not missed.
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return FrontierPop::Cancelled;
            }

            if let Some(popped) = self.try_pop() {
                return popped;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return FrontierPop::Cancelled,
                _ = &mut notified => {}
            }
        }
    }

    /// Non-blocking pop; `None` means "wait for a notification"
    fn try_pop(&self) -> Option<FrontierPop> {
        let mut inner = self.lock();

        if let Some(url) = inner.queue.pop_front() {
            inner.in_flight += 1;
            let more = !inner.queue.is_empty();
            drop(inner);
            // Chain the wakeup so idle workers pick up the rest.
            if more {
                self.notify.notify_one();
            }
            return Some(FrontierPop::Task(url));
        }

        if inner.closed || inner.in_flight == 0 {
            inner.closed = true;
            drop(inner);
            self.notify.notify_waiters();
            return Some(FrontierPop::Exhausted);
        }

        None
    }

    /// Marks one popped URL as fully processed
    ///
    /// Must be called after every pushed discovery from that URL, so that
    /// the in-flight count covers the gap between pop and push.
    pub fn complete(&self) {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);

        if inner.in_flight == 0 && inner.queue.is_empty() {
            inner.closed = true;
            drop(inner);
            self.notify.notify_waiters();
        }
    }

    /// Number of URLs waiting to be popped
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of URLs popped but not yet completed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// True once completion was detected
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
