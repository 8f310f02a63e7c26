//! Destination Resolver
//!
//! Comments, events and message references all carry a bare id that may name a
//! blog, post, product or comment. Resolution runs one typed probe per
//! collection concurrently and keeps the highest-priority hit.
//!
//! Priority is Blog > Post > Product > Comment. Ids are not unique across
//! collections at the store level, so lower-priority hits are dropped.

use crate::error::{Error, Result};
use crate::models::{Blog, Comment, DestinationKind, Post, Product};
use crate::store::EntityStore;
use crate::telemetry;
use futures::future::{try_join_all, BoxFuture};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What an id resolved to
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum DestinationTarget {
    Blog(Blog),
    Post(Post),
    Product(Product),
    Comment(Comment),
}

impl DestinationTarget {
    pub fn kind(&self) -> DestinationKind {
        match self {
            DestinationTarget::Blog(_) => DestinationKind::Blog,
            DestinationTarget::Post(_) => DestinationKind::Post,
            DestinationTarget::Product(_) => DestinationKind::Product,
            DestinationTarget::Comment(_) => DestinationKind::Comment,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DestinationTarget::Blog(b) => &b.id,
            DestinationTarget::Post(p) => &p.id,
            DestinationTarget::Product(p) => &p.id,
            DestinationTarget::Comment(c) => &c.id,
        }
    }
}

type Probe =
    for<'a> fn(&'a dyn EntityStore, &'a str) -> BoxFuture<'a, Result<Option<DestinationTarget>>>;

struct ProbeEntry {
    kind: DestinationKind,
    probe: Probe,
}

fn probe_blog<'a>(
    store: &'a dyn EntityStore,
    id: &'a str,
) -> BoxFuture<'a, Result<Option<DestinationTarget>>> {
    Box::pin(async move { Ok(store.find_blog(id).await?.map(DestinationTarget::Blog)) })
}

fn probe_post<'a>(
    store: &'a dyn EntityStore,
    id: &'a str,
) -> BoxFuture<'a, Result<Option<DestinationTarget>>> {
    Box::pin(async move { Ok(store.find_post(id).await?.map(DestinationTarget::Post)) })
}

fn probe_product<'a>(
    store: &'a dyn EntityStore,
    id: &'a str,
) -> BoxFuture<'a, Result<Option<DestinationTarget>>> {
    Box::pin(async move { Ok(store.find_product(id).await?.map(DestinationTarget::Product)) })
}

fn probe_comment<'a>(
    store: &'a dyn EntityStore,
    id: &'a str,
) -> BoxFuture<'a, Result<Option<DestinationTarget>>> {
    Box::pin(async move { Ok(store.find_comment(id).await?.map(DestinationTarget::Comment)) })
}

/// Every destination collection, highest priority first
const ALL_PROBES: [ProbeEntry; 4] = [
    ProbeEntry {
        kind: DestinationKind::Blog,
        probe: probe_blog,
    },
    ProbeEntry {
        kind: DestinationKind::Post,
        probe: probe_post,
    },
    ProbeEntry {
        kind: DestinationKind::Product,
        probe: probe_product,
    },
    ProbeEntry {
        kind: DestinationKind::Comment,
        probe: probe_comment,
    },
];

/// Content collections only (message references cannot point at comments)
const CONTENT_PROBES: usize = 3;

#[derive(Clone)]
pub struct DestinationResolver {
    store: Arc<dyn EntityStore>,
}

impl DestinationResolver {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Resolve across blogs, posts, products and comments
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &str) -> Result<DestinationTarget> {
        self.resolve_among(id, &ALL_PROBES).await
    }

    /// Resolve across blogs, posts and products
    #[instrument(skip(self))]
    pub async fn resolve_content(&self, id: &str) -> Result<DestinationTarget> {
        self.resolve_among(id, &ALL_PROBES[..CONTENT_PROBES]).await
    }

    async fn resolve_among(&self, id: &str, table: &[ProbeEntry]) -> Result<DestinationTarget> {
        let store = self.store.as_ref();
        let hits = try_join_all(table.iter().map(|entry| (entry.probe)(store, id))).await?;

        let mut resolved: Option<DestinationTarget> = None;
        for (entry, hit) in table.iter().zip(hits) {
            match (hit, &resolved) {
                (Some(target), None) => resolved = Some(target),
                (Some(_), Some(winner)) => debug!(
                    id,
                    kept = %winner.kind(),
                    dropped = %entry.kind,
                    "id exists in more than one collection"
                ),
                (None, _) => {}
            }
        }

        match resolved {
            Some(target) => {
                telemetry::record_destination_lookup(target.kind().as_str());
                Ok(target)
            }
            None => {
                telemetry::record_destination_lookup("not_found");
                Err(Error::destination_not_found(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, Engagement};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn blog(id: &str) -> Blog {
        Blog {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            blog_title: "title".to_string(),
            body: String::new(),
            tagged_users: vec![],
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            caption: "caption".to_string(),
            media_url: None,
            tagged_users: vec![],
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            title: "lamp".to_string(),
            description: String::new(),
            category: "home".to_string(),
            price: 12.5,
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    fn comment(id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            author_id: "author".to_string(),
            target_kind: DestinationKind::Post,
            target_id: "p0".to_string(),
            parent_id: None,
            body: "nice".to_string(),
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    async fn resolver_with(store: &MemoryStore) -> DestinationResolver {
        DestinationResolver::new(Arc::new(store.clone()))
    }

    #[test]
    fn test_probe_table_priority_order() {
        let kinds: Vec<_> = ALL_PROBES.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DestinationKind::Blog,
                DestinationKind::Post,
                DestinationKind::Product,
                DestinationKind::Comment
            ]
        );
    }

    #[tokio::test]
    async fn test_resolves_each_kind() {
        let store = MemoryStore::new();
        store.insert_blog(blog("b1")).await;
        store.insert_post(post("p1")).await;
        store.insert_product(product("pr1")).await;
        store.insert_comment(comment("c1")).await;
        let resolver = resolver_with(&store).await;

        for (id, kind) in [
            ("b1", DestinationKind::Blog),
            ("p1", DestinationKind::Post),
            ("pr1", DestinationKind::Product),
            ("c1", DestinationKind::Comment),
        ] {
            let target = resolver.resolve(id).await.unwrap();
            assert_eq!(target.kind(), kind);
            assert_eq!(target.id(), id);
        }
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let resolver = resolver_with(&MemoryStore::new()).await;
        let err = resolver.resolve("nope").await.unwrap_err();
        assert!(matches!(err, Error::DestinationNotFound { ref id } if id == "nope"));
    }

    #[tokio::test]
    async fn test_collision_prefers_higher_priority() {
        let store = MemoryStore::new();
        store.insert_content(ContentItem::Product(product("dup"))).await;
        store.insert_post(post("dup")).await;
        store.insert_comment(comment("dup")).await;
        let resolver = resolver_with(&store).await;

        assert_eq!(
            resolver.resolve("dup").await.unwrap().kind(),
            DestinationKind::Post
        );

        store.insert_blog(blog("dup")).await;
        assert_eq!(
            resolver.resolve("dup").await.unwrap().kind(),
            DestinationKind::Blog
        );
    }

    #[tokio::test]
    async fn test_content_resolution_skips_comments() {
        let store = MemoryStore::new();
        store.insert_comment(comment("c1")).await;
        let resolver = resolver_with(&store).await;

        assert!(resolver.resolve("c1").await.is_ok());
        assert!(matches!(
            resolver.resolve_content("c1").await.unwrap_err(),
            Error::DestinationNotFound { .. }
        ));
    }
}
