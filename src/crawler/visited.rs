use crate::url::CanonicalUrl;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// The deduplication authority for fetches
///
/// A URL is claimed at most once per crawl. Whoever wins the claim owns
/// fetching it; everyone else must neither fetch nor enqueue it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    claimed: Mutex<HashSet<CanonicalUrl>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<CanonicalUrl>> {
        match self.claimed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Atomically inserts `url` if absent
    ///
    /// Returns true if this call performed the insertion.
    pub fn claim(&self, url: &CanonicalUrl) -> bool {
        let mut claimed = self.lock();
        if claimed.contains(url) {
            return false;
        }
        claimed.insert(url.clone())
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn url(s: &str) -> CanonicalUrl {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_claim_wins() {
        let visited = VisitedSet::new();
        let a = url("https://example.com/a");

        assert!(visited.claim(&a));
        assert!(!visited.claim(&a));
        assert!(visited.contains(&a));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_equivalent_forms_share_a_claim() {
        let visited = VisitedSet::new();

        assert!(visited.claim(&url("HTTPS://Example.com:443/docs/#intro")));
        assert!(!visited.claim(&url("https://example.com/docs")));
    }

    #[test]
    fn test_exactly_once_under_contention() {
        let visited = Arc::new(VisitedSet::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        if visited.claim(&url(&format!("https://example.com/p{}", i))) {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 100);
        assert_eq!(visited.len(), 100);
    }
}
