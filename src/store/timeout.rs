//! Per-call deadline for store lookups
//!
//! Concurrent probes are joined with an all-complete barrier, so one stuck
//! lookup would otherwise hold the whole request.

use super::{ContentFilter, EdgeFilter, EntityStore};
use crate::error::{Error, Result};
use crate::models::{
    Blog, Comment, ContentItem, ContentKind, DestinationKind, Event, FollowEdge, Message, Post,
    Product, User,
};
use crate::telemetry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Store decorator that fails any call running longer than `limit`
#[derive(Clone)]
pub struct TimeoutStore {
    inner: Arc<dyn EntityStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn EntityStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.limit.as_millis() as u64;
                warn!(op, timeout_ms, "store call timed out");
                telemetry::record_store_timeout(op);
                Err(Error::QueryTimeout { timeout_ms })
            }
        }
    }
}

#[async_trait]
impl EntityStore for TimeoutStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        self.bounded("find_user", self.inner.find_user(id)).await
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>> {
        self.bounded("find_blog", self.inner.find_blog(id)).await
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        self.bounded("find_post", self.inner.find_post(id)).await
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>> {
        self.bounded("find_product", self.inner.find_product(id)).await
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>> {
        self.bounded("find_comment", self.inner.find_comment(id)).await
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        self.bounded("find_content", self.inner.find_content(kind, filter))
            .await
    }

    async fn find_follow_edges(&self, filter: &EdgeFilter) -> Result<Vec<FollowEdge>> {
        self.bounded("find_follow_edges", self.inner.find_follow_edges(filter))
            .await
    }

    async fn find_follow_edge(&self, id: &str) -> Result<Option<FollowEdge>> {
        self.bounded("find_follow_edge", self.inner.find_follow_edge(id))
            .await
    }

    async fn insert_follow_edge(&self, edge: &FollowEdge) -> Result<()> {
        self.bounded("insert_follow_edge", self.inner.insert_follow_edge(edge))
            .await
    }

    async fn accept_follow_edge(
        &self,
        id: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<FollowEdge> {
        self.bounded(
            "accept_follow_edge",
            self.inner.accept_follow_edge(id, accepted_at),
        )
        .await
    }

    async fn record_comment(
        &self,
        comment: &Comment,
        destination: DestinationKind,
        destination_id: &str,
    ) -> Result<()> {
        self.bounded(
            "record_comment",
            self.inner.record_comment(comment, destination, destination_id),
        )
        .await
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        self.bounded("record_event", self.inner.record_event(event))
            .await
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.bounded("insert_message", self.inner.insert_message(message))
            .await
    }

    async fn health_check(&self) -> Result<()> {
        self.bounded("health_check", self.inner.health_check()).await
    }
}
