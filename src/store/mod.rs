//! Entity Store
//!
//! The persistence seam for everything the engine reads or writes. The feed and
//! destination code only ever sees `dyn EntityStore`.
//!
//! ## Implementations
//!
//! - [`PgStore`]: PostgreSQL via sqlx, used by the server binary
//! - [`MemoryStore`]: in-process collections, used by tests and local runs
//! - [`TimeoutStore`]: wraps another store and bounds every call

pub mod memory;
pub mod postgres;
pub mod timeout;

use crate::error::Result;
use crate::models::{
    Blog, Comment, ContentItem, ContentKind, DestinationKind, Event, FollowEdge, Message, Post,
    Product, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use timeout::TimeoutStore;

/// Filter for `find_content`
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub owner_id: Option<String>,
    pub unblocked_only: bool,
}

impl ContentFilter {
    /// Every item of a kind, blocked or not
    pub fn all() -> Self {
        Self::default()
    }

    /// Unblocked items owned by `owner_id`
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            unblocked_only: true,
        }
    }

    pub fn unblocked(mut self) -> Self {
        self.unblocked_only = true;
        self
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        if self.unblocked_only && item.blocked() {
            return false;
        }
        match &self.owner_id {
            Some(owner) => item.owner_id() == owner,
            None => true,
        }
    }
}

/// Filter for `find_follow_edges`. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    pub user_id: Option<String>,
    pub follower_id: Option<String>,
    pub accepted: Option<bool>,
}

impl EdgeFilter {
    /// Edges pointing at `user_id`, pending or accepted
    pub fn followers_of(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// Accepted edges going out of `follower_id`
    pub fn accepted_following_of(follower_id: impl Into<String>) -> Self {
        Self {
            follower_id: Some(follower_id.into()),
            accepted: Some(true),
            ..Default::default()
        }
    }

    /// The edge for one (user, follower) pair
    pub fn pair(user_id: impl Into<String>, follower_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            follower_id: Some(follower_id.into()),
            accepted: None,
        }
    }

    pub fn matches(&self, edge: &FollowEdge) -> bool {
        self.user_id.as_deref().map_or(true, |u| edge.user_id == u)
            && self
                .follower_id
                .as_deref()
                .map_or(true, |f| edge.follower_id == f)
            && self.accepted.map_or(true, |a| edge.accepted == a)
    }
}

/// Persistence operations the engine depends on
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>>;

    async fn find_post(&self, id: &str) -> Result<Option<Post>>;

    async fn find_product(&self, id: &str) -> Result<Option<Product>>;

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>>;

    /// Items of one kind matching `filter`, newest first
    async fn find_content(&self, kind: ContentKind, filter: &ContentFilter)
        -> Result<Vec<ContentItem>>;

    /// Edges matching `filter`, newest request first
    async fn find_follow_edges(&self, filter: &EdgeFilter) -> Result<Vec<FollowEdge>>;

    async fn find_follow_edge(&self, id: &str) -> Result<Option<FollowEdge>>;

    /// Fails with `Conflict` if the (user, follower) pair already has an edge
    async fn insert_follow_edge(&self, edge: &FollowEdge) -> Result<()>;

    /// Marks the edge accepted and returns it
    async fn accept_follow_edge(&self, id: &str, accepted_at: DateTime<Utc>)
        -> Result<FollowEdge>;

    /// Stores `comment` and adds one to the comment counter of the destination,
    /// both or neither. `NotFound` if the destination is gone.
    async fn record_comment(
        &self,
        comment: &Comment,
        destination: DestinationKind,
        destination_id: &str,
    ) -> Result<()>;

    /// Stores `event` and bumps its counter on the event's target, both or neither
    async fn record_event(&self, event: &Event) -> Result<()>;

    async fn insert_message(&self, message: &Message) -> Result<()>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
