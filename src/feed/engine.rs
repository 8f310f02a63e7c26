//! Feed assembly
//!
//! `GetFeed` builds two tiers:
//! 1. Network content: one shuffled batch per follow edge, each batch
//!    prepended to the accumulator in edge order (newest edge first), so the
//!    oldest edge's batch ends up at the front.
//! 2. Discovery content: the global universe minus anything already in tier 1,
//!    shuffled once.

use super::aggregator::{counterpart, ContentAggregator, EdgeBatch};
use super::dedup::{exclude_seen, SeenIds};
use super::graph::SocialGraphReader;
use super::projection::FeedEntry;
use super::shuffle::shuffle;
use crate::auth::{require_authenticated, require_self, require_verified, AuthContext};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::models::{ContentItem, FollowEdge};
use crate::store::EntityStore;
use crate::telemetry::{self, FeedMetrics, PerformanceTimer};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Assembly switches
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedOptions {
    /// Let blocked items into the discovery tier
    pub discovery_include_blocked: bool,
    /// Log and skip an edge whose content fetch fails
    pub partial_on_edge_error: bool,
}

impl From<&FeedConfig> for FeedOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            discovery_include_blocked: config.discovery_include_blocked,
            partial_on_edge_error: config.partial_on_edge_error,
        }
    }
}

/// Both tiers of one feed, before projection
#[derive(Debug, Clone, Default)]
pub struct FeedResult {
    pub tier_one: Vec<ContentItem>,
    pub tier_two: Vec<ContentItem>,
}

impl FeedResult {
    pub fn len(&self) -> usize {
        self.tier_one.len() + self.tier_two.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tier 1 followed by tier 2
    pub fn into_items(self) -> Vec<ContentItem> {
        let mut items = self.tier_one;
        items.extend(self.tier_two);
        items
    }

    pub fn into_entries(self) -> Vec<FeedEntry> {
        self.into_items().into_iter().map(FeedEntry::from).collect()
    }
}

#[derive(Clone)]
pub struct FeedEngine {
    store: Arc<dyn EntityStore>,
    graph: SocialGraphReader,
    aggregator: ContentAggregator,
    options: FeedOptions,
}

impl FeedEngine {
    pub fn new(store: Arc<dyn EntityStore>, options: FeedOptions) -> Self {
        Self {
            graph: SocialGraphReader::new(store.clone()),
            aggregator: ContentAggregator::new(store.clone()),
            store,
            options,
        }
    }

    pub fn options(&self) -> FeedOptions {
        self.options
    }

    /// The caller's own feed, freshly shuffled
    pub async fn get_feed(&self, ctx: &AuthContext, user_id: &str) -> Result<Vec<FeedEntry>> {
        let mut rng = StdRng::from_entropy();
        self.get_feed_with_rng(ctx, user_id, &mut rng).await
    }

    /// Same as [`get_feed`](Self::get_feed) with a caller-supplied random source
    #[instrument(skip(self, ctx, rng))]
    pub async fn get_feed_with_rng<R: Rng + Send>(
        &self,
        ctx: &AuthContext,
        user_id: &str,
        rng: &mut R,
    ) -> Result<Vec<FeedEntry>> {
        match self.authorized_build(ctx, user_id, rng).await {
            Ok(result) => Ok(result.into_entries()),
            Err(err) => {
                telemetry::record_feed_failure(err.error_code());
                Err(err)
            }
        }
    }

    async fn authorized_build<R: Rng + Send>(
        &self,
        ctx: &AuthContext,
        user_id: &str,
        rng: &mut R,
    ) -> Result<FeedResult> {
        let caller_id = require_authenticated(ctx)?;
        require_self(caller_id, user_id)?;
        require_verified(self.store.as_ref(), caller_id).await?;
        self.build_feed(user_id, rng).await
    }

    /// Builds both tiers for `user_id` without authorization checks
    pub async fn build_feed<R: Rng + Send>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<FeedResult> {
        let timer = PerformanceTimer::new("build_feed");
        let mut metrics = FeedMetrics::for_user(user_id);

        let edges = self.graph.edges_for_feed(user_id).await?;
        metrics.edges = edges.len();

        let contributing = contributing_edges(&edges, user_id);
        let batches = self.load_batches(&contributing, user_id, &mut metrics).await?;

        let mut tier_one: Vec<ContentItem> = Vec::new();
        for batch in batches {
            let mut items = batch.items;
            shuffle(&mut items, rng);
            items.extend(tier_one);
            tier_one = items;
        }
        metrics.tier_one = tier_one.len();

        let universe = self
            .aggregator
            .universe(self.options.discovery_include_blocked)
            .await?;
        metrics.universe = universe.len();

        let mut seen = SeenIds::from_items(&tier_one);
        let mut tier_two = exclude_seen(universe, &mut seen);
        shuffle(&mut tier_two, rng);
        metrics.tier_two = tier_two.len();

        metrics.duration_ms = timer.elapsed_ms();
        timer.log_if_slow(1000);
        metrics.record();
        info!(
            user_id,
            edges = metrics.edges,
            tier_one = metrics.tier_one,
            tier_two = metrics.tier_two,
            deduplicated = metrics.deduplicated(),
            "feed assembled"
        );

        Ok(FeedResult { tier_one, tier_two })
    }

    /// Fetches every contributing edge concurrently, keeping edge order
    async fn load_batches(
        &self,
        edges: &[&FollowEdge],
        user_id: &str,
        metrics: &mut FeedMetrics,
    ) -> Result<Vec<EdgeBatch>> {
        let results = join_all(
            edges
                .iter()
                .map(|edge| self.aggregator.batch_for_edge(edge, user_id)),
        )
        .await;

        let mut batches = Vec::with_capacity(results.len());
        for (edge, result) in edges.iter().zip(results) {
            match result {
                Ok(batch) => batches.push(batch),
                Err(err) if self.options.partial_on_edge_error => {
                    warn!(edge_id = %edge.id, error = %err, "skipping edge");
                    metrics.skipped_edges += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(batches)
    }
}

/// Edges whose counterpart contributes content: self-edges are dropped and each
/// counterpart is taken once, from its newest edge.
fn contributing_edges<'a>(edges: &'a [FollowEdge], user_id: &str) -> Vec<&'a FollowEdge> {
    let mut counterparts = HashSet::new();
    edges
        .iter()
        .filter(|edge| {
            let (other, _) = counterpart(edge, user_id);
            if other == user_id {
                debug!(edge_id = %edge.id, "ignoring self edge");
                return false;
            }
            counterparts.insert(other.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{Engagement, Post, User};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use rand_chacha::ChaCha8Rng;

    fn user(id: &str, verified: bool) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            verified,
            created_at: Utc::now(),
        }
    }

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

    fn accepted(id: &str, user: &str, follower: &str, age_mins: i64) -> FollowEdge {
        let at = Utc::now() - Duration::minutes(age_mins);
        FollowEdge {
            id: id.to_string(),
            user_id: user.to_string(),
            follower_id: follower.to_string(),
            accepted: true,
            requested_at: at,
            accepted_at: Some(at),
        }
    }

    fn owners(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.owner_id()).collect()
    }

    #[test]
    fn test_contributing_edges_dedups_counterparts() {
        let edges = vec![
            accepted("e1", "a", "b", 1),
            accepted("e2", "b", "a", 2),
            accepted("e3", "a", "a", 3),
            accepted("e4", "c", "a", 4),
        ];
        let ids: Vec<_> = contributing_edges(&edges, "a")
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e1", "e4"]);
    }

    #[tokio::test]
    async fn test_oldest_edge_batch_leads_tier_one() {
        let store = MemoryStore::new();
        store.seed_follow_edge(accepted("new", "a", "b", 1)).await;
        store.seed_follow_edge(accepted("old", "a", "c", 60)).await;
        for (id, owner) in [("b1", "b"), ("b2", "b"), ("c1", "c"), ("c2", "c")] {
            store.insert_content(post(id, owner, false)).await;
        }

        let engine = FeedEngine::new(Arc::new(store), FeedOptions::default());
        let result = engine
            .build_feed("a", &mut ChaCha8Rng::seed_from_u64(3))
            .await
            .unwrap();

        assert_eq!(owners(&result.tier_one), vec!["c", "c", "b", "b"]);
        assert!(result.tier_two.is_empty());
    }

    #[tokio::test]
    async fn test_partial_mode_skips_nothing_when_healthy() {
        let store = MemoryStore::new();
        store.seed_follow_edge(accepted("e1", "a", "b", 1)).await;
        store.insert_content(post("b1", "b", false)).await;

        let options = FeedOptions {
            partial_on_edge_error: true,
            ..Default::default()
        };
        let engine = FeedEngine::new(Arc::new(store), options);
        let result = engine
            .build_feed("a", &mut ChaCha8Rng::seed_from_u64(9))
            .await
            .unwrap();
        assert_eq!(result.tier_one.len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_blocked_policy() {
        let store = MemoryStore::new();
        store.insert_content(post("open", "x", false)).await;
        store.insert_content(post("hidden", "x", true)).await;
        let store = Arc::new(store);

        let filtered = FeedEngine::new(store.clone(), FeedOptions::default())
            .build_feed("a", &mut ChaCha8Rng::seed_from_u64(1))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        let unfiltered = FeedEngine::new(
            store,
            FeedOptions {
                discovery_include_blocked: true,
                ..Default::default()
            },
        )
        .build_feed("a", &mut ChaCha8Rng::seed_from_u64(1))
        .await
        .unwrap();
        assert_eq!(unfiltered.len(), 2);
    }

    #[tokio::test]
    async fn test_get_feed_authorization() {
        let store = MemoryStore::new();
        store.insert_user(user("a", true)).await;
        store.insert_user(user("pending", false)).await;
        let engine = FeedEngine::new(Arc::new(store), FeedOptions::default());

        let err = engine
            .get_feed(&AuthContext::anonymous(), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));

        let err = engine
            .get_feed(&AuthContext::for_user("a"), "pending")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let err = engine
            .get_feed(&AuthContext::for_user("pending"), "pending")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        assert!(engine
            .get_feed(&AuthContext::for_user("a"), "a")
            .await
            .unwrap()
            .is_empty());
    }
}
