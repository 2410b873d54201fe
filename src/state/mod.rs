//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The orchestrator's lifecycle (seeding, running, draining, terminated)
//! - `PageState`: The fetch status tag carried by every node in the graph
//! - `RateGate`: The single crawl-wide pacing gate shared by all workers

mod crawl_phase;
mod pacing;
mod page_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use pacing::RateGate;
pub use page_state::PageState;
