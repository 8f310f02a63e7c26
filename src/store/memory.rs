//! In-process entity store
//!
//! Holds every collection behind one `RwLock`. Seeding helpers live on the
//! concrete type so tests can build fixtures that the trait never exposes
//! (including ids that collide across collections).

use super::{ContentFilter, EdgeFilter, EntityStore};
use crate::error::{Error, Result};
use crate::models::{
    Blog, Comment, ContentItem, ContentKind, Counter, DestinationKind, Engagement, Event,
    FollowEdge, Message, Post, Product, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    blogs: HashMap<String, Blog>,
    posts: HashMap<String, Post>,
    products: HashMap<String, Product>,
    comments: HashMap<String, Comment>,
    follows: HashMap<String, FollowEdge>,
    events: Vec<Event>,
    messages: Vec<Message>,
}

impl Collections {
    fn engagement_mut(&mut self, kind: DestinationKind, id: &str) -> Option<&mut Engagement> {
        match kind {
            DestinationKind::Blog => self.blogs.get_mut(id).map(|b| &mut b.engagement),
            DestinationKind::Post => self.posts.get_mut(id).map(|p| &mut p.engagement),
            DestinationKind::Product => self.products.get_mut(id).map(|p| &mut p.engagement),
            DestinationKind::Comment => self.comments.get_mut(id).map(|c| &mut c.engagement),
        }
    }

    fn bump(&mut self, kind: DestinationKind, id: &str, counter: Counter) -> Result<()> {
        let engagement = self
            .engagement_mut(kind, id)
            .ok_or_else(|| Error::not_found(kind.as_str(), id))?;
        engagement.bump(counter);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn insert_blog(&self, blog: Blog) {
        self.inner.write().await.blogs.insert(blog.id.clone(), blog);
    }

    pub async fn insert_post(&self, post: Post) {
        self.inner.write().await.posts.insert(post.id.clone(), post);
    }

    pub async fn insert_product(&self, product: Product) {
        self.inner
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    pub async fn insert_content(&self, item: ContentItem) {
        match item {
            ContentItem::Blog(b) => self.insert_blog(b).await,
            ContentItem::Post(p) => self.insert_post(p).await,
            ContentItem::Product(p) => self.insert_product(p).await,
        }
    }

    /// Inserts a comment without touching any counter, for fixtures
    pub async fn insert_comment(&self, comment: Comment) {
        self.inner
            .write()
            .await
            .comments
            .insert(comment.id.clone(), comment);
    }

    /// Inserts an edge without the pair check, for fixtures
    pub async fn seed_follow_edge(&self, edge: FollowEdge) {
        self.inner.write().await.follows.insert(edge.id.clone(), edge);
    }

    pub async fn comments(&self) -> Vec<Comment> {
        self.inner.read().await.comments.values().cloned().collect()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.inner.read().await.events.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.read().await.messages.clone()
    }
}

fn newest_first(items: &mut [ContentItem]) {
    items.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>> {
        Ok(self.inner.read().await.blogs.get(id).cloned())
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.inner.read().await.posts.get(id).cloned())
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>> {
        Ok(self.inner.read().await.comments.get(id).cloned())
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        let collections = self.inner.read().await;
        let mut items: Vec<ContentItem> = match kind {
            ContentKind::Blog => collections
                .blogs
                .values()
                .cloned()
                .map(ContentItem::Blog)
                .collect(),
            ContentKind::Post => collections
                .posts
                .values()
                .cloned()
                .map(ContentItem::Post)
                .collect(),
            ContentKind::Product => collections
                .products
                .values()
                .cloned()
                .map(ContentItem::Product)
                .collect(),
        };
        items.retain(|item| filter.matches(item));
        newest_first(&mut items);
        Ok(items)
    }

    async fn find_follow_edges(&self, filter: &EdgeFilter) -> Result<Vec<FollowEdge>> {
        let collections = self.inner.read().await;
        let mut edges: Vec<FollowEdge> = collections
            .follows
            .values()
            .filter(|edge| filter.matches(edge))
            .cloned()
            .collect();
        edges.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(edges)
    }

    async fn find_follow_edge(&self, id: &str) -> Result<Option<FollowEdge>> {
        Ok(self.inner.read().await.follows.get(id).cloned())
    }

    async fn insert_follow_edge(&self, edge: &FollowEdge) -> Result<()> {
        let mut collections = self.inner.write().await;
        let pair = EdgeFilter::pair(edge.user_id.as_str(), edge.follower_id.as_str());
        if collections.follows.values().any(|e| pair.matches(e)) {
            return Err(Error::conflict(format!(
                "{} already has a follow edge to {}",
                edge.follower_id, edge.user_id
            )));
        }
        collections.follows.insert(edge.id.clone(), edge.clone());
        Ok(())
    }

    async fn accept_follow_edge(
        &self,
        id: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<FollowEdge> {
        let mut collections = self.inner.write().await;
        let edge = collections
            .follows
            .get_mut(id)
            .ok_or_else(|| Error::not_found("follow_edge", id))?;
        edge.accepted = true;
        edge.accepted_at = Some(accepted_at);
        Ok(edge.clone())
    }

    async fn record_comment(
        &self,
        comment: &Comment,
        destination: DestinationKind,
        destination_id: &str,
    ) -> Result<()> {
        let mut collections = self.inner.write().await;
        collections.bump(destination, destination_id, Counter::Comments)?;
        collections
            .comments
            .insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        let mut collections = self.inner.write().await;
        collections.bump(event.target_kind, &event.target_id, event.kind.counter())?;
        collections.events.push(event.clone());
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.inner.write().await.messages.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;

    fn blog(id: &str) -> Blog {
        Blog {
            id: id.to_string(),
            owner_id: "bob".to_string(),
            blog_title: "notes".to_string(),
            body: String::new(),
            tagged_users: vec![],
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    fn comment(id: &str, target_id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            author_id: "alice".to_string(),
            target_kind: DestinationKind::Blog,
            target_id: target_id.to_string(),
            parent_id: None,
            body: "hi".to_string(),
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    fn like(target_id: &str) -> Event {
        Event {
            id: format!("like-{}", target_id),
            actor_id: "alice".to_string(),
            kind: EventKind::Like,
            target_kind: DestinationKind::Blog,
            target_id: target_id.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_comment_bumps_destination() {
        let store = MemoryStore::new();
        store.insert_blog(blog("b1")).await;

        store
            .record_comment(&comment("c1", "b1"), DestinationKind::Blog, "b1")
            .await
            .unwrap();

        assert!(store.find_comment("c1").await.unwrap().is_some());
        let blog = store.find_blog("b1").await.unwrap().unwrap();
        assert_eq!(blog.engagement.comments, 1);
    }

    #[tokio::test]
    async fn test_missing_destination_writes_nothing() {
        let store = MemoryStore::new();

        let err = store
            .record_comment(&comment("c1", "gone"), DestinationKind::Blog, "gone")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(store.comments().await.is_empty());

        let err = store.record_event(&like("gone")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_event_bumps_matching_counter() {
        let store = MemoryStore::new();
        store.insert_blog(blog("b1")).await;

        store.record_event(&like("b1")).await.unwrap();

        let blog = store.find_blog("b1").await.unwrap().unwrap();
        assert_eq!(blog.engagement.likes, 1);
        assert_eq!(blog.engagement.comments, 0);
        assert_eq!(store.events().await.len(), 1);
    }
}
