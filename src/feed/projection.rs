//! Output shapes for feed entries
//!
//! The kind travels with each item from aggregation onward, so projecting is a
//! plain match on the tag.

use crate::models::{Blog, ContentItem, ContentKind, Engagement, Post, Product};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogView {
    pub id: String,
    pub owner_id: String,
    pub blog_title: String,
    pub body: String,
    pub tagged_users: Vec<String>,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: String,
    pub owner_id: String,
    pub caption: String,
    pub media_url: Option<String>,
    pub tagged_users: Vec<String>,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

/// One feed entry as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum FeedEntry {
    Blog(BlogView),
    Post(PostView),
    Product(ProductView),
}

impl FeedEntry {
    pub fn kind(&self) -> ContentKind {
        match self {
            FeedEntry::Blog(_) => ContentKind::Blog,
            FeedEntry::Post(_) => ContentKind::Post,
            FeedEntry::Product(_) => ContentKind::Product,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            FeedEntry::Blog(v) => &v.id,
            FeedEntry::Post(v) => &v.id,
            FeedEntry::Product(v) => &v.id,
        }
    }
}

impl From<Blog> for BlogView {
    fn from(blog: Blog) -> Self {
        Self {
            id: blog.id,
            owner_id: blog.owner_id,
            blog_title: blog.blog_title,
            body: blog.body,
            tagged_users: blog.tagged_users,
            engagement: blog.engagement,
            created_at: blog.created_at,
        }
    }
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            owner_id: post.owner_id,
            caption: post.caption,
            media_url: post.media_url,
            tagged_users: post.tagged_users,
            engagement: post.engagement,
            created_at: post.created_at,
        }
    }
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            owner_id: product.owner_id,
            title: product.title,
            description: product.description,
            category: product.category,
            price: product.price,
            engagement: product.engagement,
            created_at: product.created_at,
        }
    }
}

impl From<ContentItem> for FeedEntry {
    fn from(item: ContentItem) -> Self {
        match item {
            ContentItem::Blog(b) => FeedEntry::Blog(b.into()),
            ContentItem::Post(p) => FeedEntry::Post(p.into()),
            ContentItem::Product(p) => FeedEntry::Product(p.into()),
        }
    }
}
