//! Content Aggregator
//!
//! Turns a follow edge into the other party's unblocked content, and loads the
//! discovery universe.

use crate::error::Result;
use crate::models::{ContentItem, ContentKind, FollowEdge};
use crate::store::{ContentFilter, EntityStore};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Which side of the edge the counterpart sits on, seen from the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The counterpart follows the requester
    Follower,
    /// The requester follows the counterpart
    Following,
}

/// Content contributed by one edge
#[derive(Debug, Clone)]
pub struct EdgeBatch {
    pub edge_id: String,
    pub counterpart_id: String,
    pub provenance: Provenance,
    pub items: Vec<ContentItem>,
}

/// The party on the other end of `edge` from `requester`
pub fn counterpart<'a>(edge: &'a FollowEdge, requester: &str) -> (&'a str, Provenance) {
    if edge.user_id == requester {
        (edge.follower_id.as_str(), Provenance::Follower)
    } else {
        (edge.user_id.as_str(), Provenance::Following)
    }
}

#[derive(Clone)]
pub struct ContentAggregator {
    store: Arc<dyn EntityStore>,
}

impl ContentAggregator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Unblocked products, posts and blogs owned by `owner_id`, fetched concurrently
    pub async fn unblocked_content_of(&self, owner_id: &str) -> Result<Vec<ContentItem>> {
        let filter = ContentFilter::owned_by(owner_id);
        self.fetch_all_kinds(&filter).await
    }

    #[instrument(skip(self, edge), fields(edge_id = %edge.id))]
    pub async fn batch_for_edge(&self, edge: &FollowEdge, requester: &str) -> Result<EdgeBatch> {
        let (other, provenance) = counterpart(edge, requester);
        let items = self.unblocked_content_of(other).await?;
        Ok(EdgeBatch {
            edge_id: edge.id.clone(),
            counterpart_id: other.to_string(),
            provenance,
            items,
        })
    }

    /// Every product, post and blog; blocked items only when asked for
    #[instrument(skip(self))]
    pub async fn universe(&self, include_blocked: bool) -> Result<Vec<ContentItem>> {
        let filter = if include_blocked {
            ContentFilter::all()
        } else {
            ContentFilter::all().unblocked()
        };
        self.fetch_all_kinds(&filter).await
    }

    async fn fetch_all_kinds(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>> {
        let batches = try_join_all(
            ContentKind::ALL
                .iter()
                .map(|kind| self.store.find_content(*kind, filter)),
        )
        .await?;
        Ok(batches.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Blog, Engagement, Post, Product};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn post(id: &str, owner: &str, blocked: bool) -> ContentItem {
        ContentItem::Post(Post {
            id: id.to_string(),
            owner_id: owner.to_string(),
            caption: String::new(),
            media_url: None,
            tagged_users: vec![],
            blocked,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        })
    }

    fn blog(id: &str, owner: &str) -> ContentItem {
        ContentItem::Blog(Blog {
            id: id.to_string(),
            owner_id: owner.to_string(),
            blog_title: "notes".to_string(),
            body: String::new(),
            tagged_users: vec![],
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        })
    }

    fn product(id: &str, owner: &str, blocked: bool) -> ContentItem {
        ContentItem::Product(Product {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: "chair".to_string(),
            description: String::new(),
            category: "home".to_string(),
            price: 40.0,
            blocked,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        })
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for item in [
            post("p1", "b", false),
            post("p2", "b", true),
            blog("bl1", "b"),
            product("pr1", "b", false),
            product("pr2", "c", true),
            post("p3", "c", false),
        ] {
            store.insert_content(item).await;
        }
        store
    }

    #[test]
    fn test_counterpart_direction() {
        let incoming = FollowEdge::request("a", "b");
        assert_eq!(counterpart(&incoming, "a"), ("b", Provenance::Follower));

        let outgoing = FollowEdge::request("c", "a");
        assert_eq!(counterpart(&outgoing, "a"), ("c", Provenance::Following));
    }

    #[tokio::test]
    async fn test_edge_batch_skips_blocked_and_other_owners() {
        let aggregator = ContentAggregator::new(Arc::new(seeded().await));
        let batch = aggregator
            .batch_for_edge(&FollowEdge::request("a", "b"), "a")
            .await
            .unwrap();

        assert_eq!(batch.counterpart_id, "b");
        assert_eq!(batch.provenance, Provenance::Follower);
        let mut ids: Vec<_> = batch.items.iter().map(|i| i.id()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["bl1", "p1", "pr1"]);
        assert!(batch.items.iter().all(|i| !i.blocked()));
    }

    #[tokio::test]
    async fn test_universe_blocked_policy() {
        let aggregator = ContentAggregator::new(Arc::new(seeded().await));

        let filtered = aggregator.universe(false).await.unwrap();
        assert_eq!(filtered.len(), 4);
        assert!(filtered.iter().all(|i| !i.blocked()));

        let everything = aggregator.universe(true).await.unwrap();
        assert_eq!(everything.len(), 6);
    }

    #[tokio::test]
    async fn test_kinds_arrive_in_fetch_order() {
        let aggregator = ContentAggregator::new(Arc::new(seeded().await));
        let kinds: Vec<_> = aggregator
            .unblocked_content_of("b")
            .await
            .unwrap()
            .iter()
            .map(|i| i.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![ContentKind::Product, ContentKind::Post, ContentKind::Blog]
        );
    }
}
