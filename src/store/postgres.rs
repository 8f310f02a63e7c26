//! PostgreSQL entity store
//!
//! Each collection is a table; rows are mapped through `FromRow` structs and
//! converted into domain types so kinds and counters stay typed above this layer.

use super::{ContentFilter, EdgeFilter, EntityStore};
use crate::error::{Error, Result};
use crate::models::{
    Blog, Comment, ContentItem, ContentKind, Counter, DestinationKind, Engagement, Event,
    FollowEdge, Message, Post, Product, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn table(kind: DestinationKind) -> &'static str {
        match kind {
            DestinationKind::Blog => "blogs",
            DestinationKind::Post => "posts",
            DestinationKind::Product => "products",
            DestinationKind::Comment => "comments",
        }
    }

    /// Adds one to `counter` inside `tx`. The row stays locked until commit.
    async fn bump(
        tx: &mut Transaction<'_, Postgres>,
        kind: DestinationKind,
        id: &str,
        counter: Counter,
    ) -> Result<()> {
        let column = counter.column();
        let result = sqlx::query(&format!(
            "UPDATE {} SET {} = {} + 1 WHERE id = $1",
            Self::table(kind),
            column,
            column
        ))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(kind.as_str(), id));
        }
        Ok(())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

/// Counter columns shared by every destination table
#[derive(Debug, sqlx::FromRow)]
struct EngagementRow {
    comments_count: i64,
    likes_count: i64,
    views_count: i64,
    shares_count: i64,
}

impl From<EngagementRow> for Engagement {
    fn from(row: EngagementRow) -> Self {
        Self {
            comments: row.comments_count,
            likes: row.likes_count,
            views: row.views_count,
            shares: row.shares_count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BlogRow {
    id: String,
    owner_id: String,
    blog_title: String,
    body: String,
    tagged_users: Vec<String>,
    blocked: bool,
    #[sqlx(flatten)]
    engagement: EngagementRow,
    created_at: DateTime<Utc>,
}

impl From<BlogRow> for Blog {
    fn from(row: BlogRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            blog_title: row.blog_title,
            body: row.body,
            tagged_users: row.tagged_users,
            blocked: row.blocked,
            engagement: row.engagement.into(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: String,
    owner_id: String,
    caption: String,
    media_url: Option<String>,
    tagged_users: Vec<String>,
    blocked: bool,
    #[sqlx(flatten)]
    engagement: EngagementRow,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            caption: row.caption,
            media_url: row.media_url,
            tagged_users: row.tagged_users,
            blocked: row.blocked,
            engagement: row.engagement.into(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    owner_id: String,
    title: String,
    description: String,
    category: String,
    price: f64,
    blocked: bool,
    #[sqlx(flatten)]
    engagement: EngagementRow,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            category: row.category,
            price: row.price,
            blocked: row.blocked,
            engagement: row.engagement.into(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: String,
    author_id: String,
    target_kind: String,
    target_id: String,
    parent_id: Option<String>,
    body: String,
    blocked: bool,
    #[sqlx(flatten)]
    engagement: EngagementRow,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = Error;

    fn try_from(row: CommentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            author_id: row.author_id,
            target_kind: row.target_kind.parse()?,
            target_id: row.target_id,
            parent_id: row.parent_id,
            body: row.body,
            blocked: row.blocked,
            engagement: row.engagement.into(),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FollowRow {
    id: String,
    user_id: String,
    follower_id: String,
    accepted: bool,
    requested_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

impl From<FollowRow> for FollowEdge {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            follower_id: row.follower_id,
            accepted: row.accepted,
            requested_at: row.requested_at,
            accepted_at: row.accepted_at,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

const COUNTERS: &str = "comments_count, likes_count, views_count, shares_count";

const CONTENT_WHERE: &str = "WHERE ($1::text IS NULL OR owner_id = $1) \
     AND ($2 = false OR blocked = false) \
     ORDER BY created_at DESC, id";

const FOLLOW_COLUMNS: &str = "id, user_id, follower_id, accepted, requested_at, accepted_at";

fn blog_select() -> String {
    format!(
        "SELECT id, owner_id, blog_title, body, tagged_users, blocked, {}, created_at FROM blogs",
        COUNTERS
    )
}

fn post_select() -> String {
    format!(
        "SELECT id, owner_id, caption, media_url, tagged_users, blocked, {}, created_at FROM posts",
        COUNTERS
    )
}

fn product_select() -> String {
    format!(
        "SELECT id, owner_id, title, description, category, price, blocked, {}, created_at FROM products",
        COUNTERS
    )
}

#[async_trait]
impl EntityStore for PgStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, verified, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>> {
        let row = sqlx::query_as::<_, BlogRow>(&format!("{} WHERE id = $1", blog_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Blog::from))
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{} WHERE id = $1", post_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Post::from))
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{} WHERE id = $1", product_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT id, author_id, target_kind, target_id, parent_id, body, blocked, {}, created_at \
             FROM comments WHERE id = $1",
            COUNTERS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Comment::try_from).transpose()
    }

    #[instrument(skip(self, filter))]
    async fn find_content(
        &self,
        kind: ContentKind,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        let owner = filter.owner_id.as_deref();
        let unblocked_only = filter.unblocked_only;

        let items: Vec<ContentItem> = match kind {
            ContentKind::Blog => {
                sqlx::query_as::<_, BlogRow>(&format!("{} {}", blog_select(), CONTENT_WHERE))
                    .bind(owner)
                    .bind(unblocked_only)
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|row| ContentItem::Blog(row.into()))
                    .collect()
            }
            ContentKind::Post => {
                sqlx::query_as::<_, PostRow>(&format!("{} {}", post_select(), CONTENT_WHERE))
                    .bind(owner)
                    .bind(unblocked_only)
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|row| ContentItem::Post(row.into()))
                    .collect()
            }
            ContentKind::Product => {
                sqlx::query_as::<_, ProductRow>(&format!("{} {}", product_select(), CONTENT_WHERE))
                    .bind(owner)
                    .bind(unblocked_only)
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(|row| ContentItem::Product(row.into()))
                    .collect()
            }
        };

        debug!("Loaded {} {} items", items.len(), kind);
        Ok(items)
    }

    async fn find_follow_edges(&self, filter: &EdgeFilter) -> Result<Vec<FollowEdge>> {
        let rows = sqlx::query_as::<_, FollowRow>(&format!(
            r#"
            SELECT {}
            FROM follows
            WHERE ($1::text IS NULL OR user_id = $1)
            AND ($2::text IS NULL OR follower_id = $2)
            AND ($3::bool IS NULL OR accepted = $3)
            ORDER BY requested_at DESC, id
            "#,
            FOLLOW_COLUMNS
        ))
        .bind(filter.user_id.as_deref())
        .bind(filter.follower_id.as_deref())
        .bind(filter.accepted)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FollowEdge::from).collect())
    }

    async fn find_follow_edge(&self, id: &str) -> Result<Option<FollowEdge>> {
        let row = sqlx::query_as::<_, FollowRow>(&format!(
            "SELECT {} FROM follows WHERE id = $1",
            FOLLOW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FollowEdge::from))
    }

    async fn insert_follow_edge(&self, edge: &FollowEdge) -> Result<()> {
        // follows_pair_key enforces one edge per (user_id, follower_id)
        sqlx::query(
            r#"
            INSERT INTO follows (id, user_id, follower_id, accepted, requested_at, accepted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&edge.id)
        .bind(&edge.user_id)
        .bind(&edge.follower_id)
        .bind(edge.accepted)
        .bind(edge.requested_at)
        .bind(edge.accepted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn accept_follow_edge(
        &self,
        id: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<FollowEdge> {
        let row = sqlx::query_as::<_, FollowRow>(&format!(
            "UPDATE follows SET accepted = true, accepted_at = $2 WHERE id = $1 RETURNING {}",
            FOLLOW_COLUMNS
        ))
        .bind(id)
        .bind(accepted_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FollowEdge::from)
            .ok_or_else(|| Error::not_found("follow_edge", id))
    }

    #[instrument(skip(self, comment), fields(comment_id = %comment.id))]
    async fn record_comment(
        &self,
        comment: &Comment,
        destination: DestinationKind,
        destination_id: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::bump(&mut tx, destination, destination_id, Counter::Comments).await?;

        sqlx::query(
            r#"
            INSERT INTO comments
                (id, author_id, target_kind, target_id, parent_id, body, blocked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.author_id)
        .bind(comment.target_kind.as_str())
        .bind(&comment.target_id)
        .bind(&comment.parent_id)
        .bind(&comment.body)
        .bind(comment.blocked)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn record_event(&self, event: &Event) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::bump(&mut tx, event.target_kind, &event.target_id, event.kind.counter()).await?;

        sqlx::query(
            r#"
            INSERT INTO events (id, actor_id, kind, target_kind, target_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&event.id)
        .bind(&event.actor_id)
        .bind(event.kind.as_str())
        .bind(event.target_kind.as_str())
        .bind(&event.target_id)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages
                (id, sender_id, recipient_id, body, reference_kind, reference_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.recipient_id)
        .bind(&message.body)
        .bind(message.reference.as_ref().map(|r| r.kind.as_str()))
        .bind(message.reference.as_ref().map(|r| r.id.as_str()))
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database {
                message: format!("Health check failed: {}", e).into(),
                source: Some(e),
            })?;
        Ok(())
    }
}
