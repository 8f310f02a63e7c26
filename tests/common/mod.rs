#![allow(dead_code)]

use agora::models::{
    Blog, Comment, ContentItem, ContentKind, DestinationKind, Engagement, Event, FollowEdge,
    Message, Post, Product, User,
};
use agora::store::{ContentFilter, EdgeFilter, EntityStore, MemoryStore};
use agora::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

pub fn user(id: &str, verified: bool) -> User {
    User {
        id: id.to_string(),
        username: format!("{}_name", id),
        verified,
        created_at: Utc::now(),
    }
}

pub fn post(id: &str, owner: &str, blocked: bool) -> Post {
    Post {
        id: id.to_string(),
        owner_id: owner.to_string(),
        caption: format!("caption {}", id),
        media_url: None,
        tagged_users: vec![],
        blocked,
        engagement: Engagement::default(),
        created_at: Utc::now(),
    }
}

pub fn blog(id: &str, owner: &str, blocked: bool) -> Blog {
    Blog {
        id: id.to_string(),
        owner_id: owner.to_string(),
        blog_title: format!("title {}", id),
        body: "body".to_string(),
        tagged_users: vec![],
        blocked,
        engagement: Engagement::default(),
        created_at: Utc::now(),
    }
}

pub fn product(id: &str, owner: &str, blocked: bool) -> Product {
    Product {
        id: id.to_string(),
        owner_id: owner.to_string(),
        title: format!("product {}", id),
        description: String::new(),
        category: "misc".to_string(),
        price: 10.0,
        blocked,
        engagement: Engagement::default(),
        created_at: Utc::now(),
    }
}

/// `follower` follows `user`, requested `age_mins` ago
pub fn edge(id: &str, user: &str, follower: &str, accepted: bool, age_mins: i64) -> FollowEdge {
    let requested_at = Utc::now() - Duration::minutes(age_mins);
    FollowEdge {
        id: id.to_string(),
        user_id: user.to_string(),
        follower_id: follower.to_string(),
        accepted,
        requested_at,
        accepted_at: accepted.then_some(requested_at),
    }
}

pub async fn seed_users(store: &MemoryStore, users: &[(&str, bool)]) {
    for (id, verified) in users {
        store.insert_user(user(id, *verified)).await;
    }
}

pub async fn seed_content(store: &MemoryStore, items: Vec<ContentItem>) {
    for item in items {
        store.insert_content(item).await;
    }
}

/// Memory store whose content lookups fail for one owner
#[derive(Clone)]
pub struct FailingOwnerStore {
    pub inner: MemoryStore,
    pub failing_owner: String,
}

#[async_trait]
impl EntityStore for FailingOwnerStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>> {
        self.inner.find_blog(id).await
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        self.inner.find_post(id).await
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>> {
        self.inner.find_product(id).await
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>> {
        self.inner.find_comment(id).await
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        if filter.owner_id.as_deref() == Some(self.failing_owner.as_str()) {
            return Err(Error::database("connection reset"));
        }
        self.inner.find_content(kind, filter).await
    }

    async fn find_follow_edges(&self, filter: &EdgeFilter) -> Result<Vec<FollowEdge>> {
        self.inner.find_follow_edges(filter).await
    }

    async fn find_follow_edge(&self, id: &str) -> Result<Option<FollowEdge>> {
        self.inner.find_follow_edge(id).await
    }

    async fn insert_follow_edge(&self, edge: &FollowEdge) -> Result<()> {
        self.inner.insert_follow_edge(edge).await
    }

    async fn accept_follow_edge(
        &self,
        id: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<FollowEdge> {
        self.inner.accept_follow_edge(id, accepted_at).await
    }

    async fn record_comment(
        &self,
        comment: &Comment,
        destination: DestinationKind,
        destination_id: &str,
    ) -> Result<()> {
        self.inner
            .record_comment(comment, destination, destination_id)
            .await
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        self.inner.record_event(event).await
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.inner.insert_message(message).await
    }
}

/// Lookups see `reads`, writes land in `writes`. Models a destination that is
/// deleted between resolution and the write.
#[derive(Clone)]
pub struct StaleReadStore {
    pub reads: MemoryStore,
    pub writes: MemoryStore,
}

#[async_trait]
impl EntityStore for StaleReadStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        self.reads.find_user(id).await
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>> {
        self.reads.find_blog(id).await
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        self.reads.find_post(id).await
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>> {
        self.reads.find_product(id).await
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>> {
        self.reads.find_comment(id).await
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        self.reads.find_content(kind, filter).await
    }

    async fn find_follow_edges(&self, filter: &EdgeFilter) -> Result<Vec<FollowEdge>> {
        self.reads.find_follow_edges(filter).await
    }

    async fn find_follow_edge(&self, id: &str) -> Result<Option<FollowEdge>> {
        self.reads.find_follow_edge(id).await
    }

    async fn insert_follow_edge(&self, edge: &FollowEdge) -> Result<()> {
        self.writes.insert_follow_edge(edge).await
    }

    async fn accept_follow_edge(
        &self,
        id: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<FollowEdge> {
        self.writes.accept_follow_edge(id, accepted_at).await
    }

    async fn record_comment(
        &self,
        comment: &Comment,
        destination: DestinationKind,
        destination_id: &str,
    ) -> Result<()> {
        self.writes
            .record_comment(comment, destination, destination_id)
            .await
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        self.writes.record_event(event).await
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.writes.insert_message(message).await
    }
}
