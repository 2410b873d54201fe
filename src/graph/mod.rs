//! Link graph construction
//!
//! `GraphBuilder` is the single owner of the emerging graph while workers are
//! running. Once the crawl terminates it is sealed and hands out immutable
//! `CrawlGraph` snapshots, which are all that downstream exporters see.

mod builder;
mod snapshot;

pub use builder::GraphBuilder;
pub use snapshot::{CrawlGraph, Edge, NodeView};
