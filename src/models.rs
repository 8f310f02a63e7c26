//! Domain entities held by the entity store
//!
//! Content is a tagged union over the three content kinds. The kind travels with
//! every item from the moment it is loaded, so nothing downstream needs to guess
//! what an item is from the fields it happens to carry.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Kinds
// ============================================================================

/// The three kinds of content that can appear in a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Blog,
    Post,
    Product,
}

impl ContentKind {
    /// Fetch order used by aggregation and discovery
    pub const ALL: [ContentKind; 3] = [ContentKind::Product, ContentKind::Post, ContentKind::Blog];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Blog => "blog",
            ContentKind::Post => "post",
            ContentKind::Product => "product",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blog" => Ok(ContentKind::Blog),
            "post" => Ok(ContentKind::Post),
            "product" => Ok(ContentKind::Product),
            other => Err(Error::validation(format!("unknown content kind '{}'", other))),
        }
    }
}

/// Anything a comment, event or message reference can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    Blog,
    Post,
    Product,
    Comment,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Blog => "blog",
            DestinationKind::Post => "post",
            DestinationKind::Product => "product",
            DestinationKind::Comment => "comment",
        }
    }

    /// The content kind behind this destination, if it is content at all
    pub fn content_kind(&self) -> Option<ContentKind> {
        match self {
            DestinationKind::Blog => Some(ContentKind::Blog),
            DestinationKind::Post => Some(ContentKind::Post),
            DestinationKind::Product => Some(ContentKind::Product),
            DestinationKind::Comment => None,
        }
    }
}

impl From<ContentKind> for DestinationKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Blog => DestinationKind::Blog,
            ContentKind::Post => DestinationKind::Post,
            ContentKind::Product => DestinationKind::Product,
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(DestinationKind::Comment),
            other => other.parse::<ContentKind>().map(DestinationKind::from),
        }
    }
}

// ============================================================================
// Engagement counters
// ============================================================================

/// Counters kept on every destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Comments on content, replies on a comment
    pub comments: i64,
    pub likes: i64,
    pub views: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Comments,
    Likes,
    Views,
    Shares,
}

impl Counter {
    pub fn column(&self) -> &'static str {
        match self {
            Counter::Comments => "comments_count",
            Counter::Likes => "likes_count",
            Counter::Views => "views_count",
            Counter::Shares => "shares_count",
        }
    }
}

impl Engagement {
    pub fn get(&self, counter: Counter) -> i64 {
        match counter {
            Counter::Comments => self.comments,
            Counter::Likes => self.likes,
            Counter::Views => self.views,
            Counter::Shares => self.shares,
        }
    }

    pub fn bump(&mut self, counter: Counter) {
        match counter {
            Counter::Comments => self.comments += 1,
            Counter::Likes => self.likes += 1,
            Counter::Views => self.views += 1,
            Counter::Shares => self.shares += 1,
        }
    }
}

// ============================================================================
// Content
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: String,
    pub owner_id: String,
    pub blog_title: String,
    pub body: String,
    pub tagged_users: Vec<String>,
    pub blocked: bool,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub caption: String,
    pub media_url: Option<String>,
    pub tagged_users: Vec<String>,
    pub blocked: bool,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub blocked: bool,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

/// A feed candidate, tagged with its kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ContentItem {
    Blog(Blog),
    Post(Post),
    Product(Product),
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Blog(_) => ContentKind::Blog,
            ContentItem::Post(_) => ContentKind::Post,
            ContentItem::Product(_) => ContentKind::Product,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ContentItem::Blog(b) => &b.id,
            ContentItem::Post(p) => &p.id,
            ContentItem::Product(p) => &p.id,
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            ContentItem::Blog(b) => &b.owner_id,
            ContentItem::Post(p) => &p.owner_id,
            ContentItem::Product(p) => &p.owner_id,
        }
    }

    pub fn blocked(&self) -> bool {
        match self {
            ContentItem::Blog(b) => b.blocked,
            ContentItem::Post(p) => p.blocked,
            ContentItem::Product(p) => p.blocked,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ContentItem::Blog(b) => b.created_at,
            ContentItem::Post(p) => p.created_at,
            ContentItem::Product(p) => p.created_at,
        }
    }
}

// ============================================================================
// Social graph
// ============================================================================

/// `follower_id` follows `user_id` once the edge is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub id: String,
    pub user_id: String,
    pub follower_id: String,
    pub accepted: bool,
    pub requested_at: DateTime<Utc>,
    /// Set iff `accepted`
    pub accepted_at: Option<DateTime<Utc>>,
}

impl FollowEdge {
    pub fn request(user_id: impl Into<String>, follower_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            follower_id: follower_id.into(),
            accepted: false,
            requested_at: Utc::now(),
            accepted_at: None,
        }
    }
}

// ============================================================================
// Interactions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub target_kind: DestinationKind,
    pub target_id: String,
    /// Set when this comment replies to another comment
    pub parent_id: Option<String>,
    pub body: String,
    pub blocked: bool,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Like,
    View,
    Share,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Like => "like",
            EventKind::View => "view",
            EventKind::Share => "share",
        }
    }

    /// Counter bumped on the destination when this event is recorded
    pub fn counter(&self) -> Counter {
        match self {
            EventKind::Like => Counter::Likes,
            EventKind::View => Counter::Views,
            EventKind::Share => Counter::Shares,
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(EventKind::Like),
            "view" => Ok(EventKind::View),
            "share" => Ok(EventKind::Share),
            other => Err(Error::validation(format!("unknown event kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub actor_id: String,
    pub kind: EventKind,
    pub target_kind: DestinationKind,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
}

/// Content attached to a direct message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    pub kind: ContentKind,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub reference: Option<MessageReference>,
    pub created_at: DateTime<Utc>,
}
