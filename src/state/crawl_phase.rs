/// Crawl lifecycle states
///
/// A crawl moves strictly forward through these phases. `Terminated` is the
/// only phase in which the graph may be snapshotted.
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Start URL is being canonicalized, claimed and queued
    Seeding,

    /// Workers are pulling from the frontier
    Running,

    /// Completion was detected; workers finish and stop pulling work
    Draining,

    /// All workers stopped; the graph is final
    Terminated,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Returns true if a move from `self` to `next` is legal
    ///
    /// Cancellation jumps from `Running` or `Draining` straight to
    /// `Terminated`; an invalid seed never leaves `Seeding`.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Seeding, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Terminated)
                | (Self::Draining, Self::Terminated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
