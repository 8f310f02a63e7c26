//! Feed Module
//!
//! Builds a user's feed from their follow graph plus global discovery content.
//!
//! ## Pipeline
//!
//! 1. **Graph** - follow edges that contribute content, newest request first
//! 2. **Aggregator** - the counterpart's unblocked products, posts and blogs per edge
//! 3. **Shuffle** - Fisher–Yates per edge batch and once over discovery
//! 4. **Dedup** - discovery drops every id already in the network tier
//! 5. **Projection** - tagged output entries

pub mod aggregator;
pub mod dedup;
pub mod engine;
pub mod graph;
pub mod projection;
pub mod shuffle;

pub use aggregator::{ContentAggregator, EdgeBatch, Provenance};
pub use engine::{FeedEngine, FeedOptions, FeedResult};
pub use graph::SocialGraphReader;
pub use projection::FeedEntry;
pub use shuffle::shuffle;
