//! Social Graph Reader

use crate::error::Result;
use crate::models::FollowEdge;
use crate::store::{EdgeFilter, EntityStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct SocialGraphReader {
    store: Arc<dyn EntityStore>,
}

impl SocialGraphReader {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Edges that feed content to `user_id`, newest request first.
    ///
    /// Incoming edges count whatever their state; outgoing edges only once the
    /// other side has accepted.
    #[instrument(skip(self))]
    pub async fn edges_for_feed(&self, user_id: &str) -> Result<Vec<FollowEdge>> {
        let incoming = EdgeFilter::followers_of(user_id);
        let outgoing = EdgeFilter::accepted_following_of(user_id);

        let (incoming, outgoing) = tokio::try_join!(
            self.store.find_follow_edges(&incoming),
            self.store.find_follow_edges(&outgoing),
        )?;

        let mut seen = HashSet::new();
        let mut edges: Vec<FollowEdge> = incoming
            .into_iter()
            .chain(outgoing)
            .filter(|edge| seen.insert(edge.id.clone()))
            .collect();
        edges.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(count = edges.len(), "loaded feed edges");
        Ok(edges)
    }
}
