//! Comments, engagement events and direct messages
//!
//! Each takes a bare destination id and runs it through the
//! [`DestinationResolver`] to learn which collection it belongs to before
//! writing anything.

use crate::auth::{
    require_authenticated, require_known_caller, require_verified, require_verified_caller,
    AuthContext,
};
use crate::destination::{DestinationResolver, DestinationTarget};
use crate::error::{Error, Result};
use crate::models::{Comment, Engagement, Event, EventKind, Message, MessageReference};
use crate::store::EntityStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct InteractionService {
    store: Arc<dyn EntityStore>,
    resolver: DestinationResolver,
}

impl InteractionService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            resolver: DestinationResolver::new(store.clone()),
            store,
        }
    }

    /// Comment on content, or reply when `to` names a comment.
    ///
    /// Bumps the comment counter of the resolved destination and nothing else.
    #[instrument(skip(self, ctx, body))]
    pub async fn post_comment(&self, ctx: &AuthContext, to: &str, body: &str) -> Result<Comment> {
        let author = require_verified_caller(self.store.as_ref(), ctx).await?;

        let body = body.trim();
        if body.is_empty() {
            return Err(Error::validation("comment body cannot be empty"));
        }

        let target = self.resolver.resolve(to).await?;
        let (target_kind, target_id, parent_id) = match &target {
            // Replies hang off the parent's own target
            DestinationTarget::Comment(parent) => (
                parent.target_kind,
                parent.target_id.clone(),
                Some(parent.id.clone()),
            ),
            other => (other.kind(), other.id().to_string(), None),
        };

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            author_id: author.id,
            target_kind,
            target_id,
            parent_id,
            body: body.to_string(),
            blocked: false,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        };

        self.store
            .record_comment(&comment, target.kind(), target.id())
            .await?;

        info!(
            comment_id = %comment.id,
            destination = %target.kind(),
            reply = comment.parent_id.is_some(),
            "comment posted"
        );
        Ok(comment)
    }

    /// Record a like, view or share on any destination
    #[instrument(skip(self, ctx))]
    pub async fn post_event(&self, ctx: &AuthContext, to: &str, kind: EventKind) -> Result<Event> {
        let actor = require_known_caller(self.store.as_ref(), ctx).await?;
        let target = self.resolver.resolve(to).await?;

        let event = Event {
            id: Uuid::new_v4().to_string(),
            actor_id: actor.id,
            kind,
            target_kind: target.kind(),
            target_id: target.id().to_string(),
            created_at: Utc::now(),
        };

        self.store.record_event(&event).await?;

        info!(event_id = %event.id, kind = kind.as_str(), destination = %target.kind(), "event recorded");
        Ok(event)
    }

    /// Direct message, optionally pointing at a blog, post or product
    #[instrument(skip(self, ctx, body))]
    pub async fn send_message(
        &self,
        ctx: &AuthContext,
        recipient_id: &str,
        body: &str,
        reference: Option<&str>,
    ) -> Result<Message> {
        let sender_id = require_authenticated(ctx)?;
        require_verified(self.store.as_ref(), sender_id).await?;

        if body.trim().is_empty() && reference.is_none() {
            return Err(Error::validation("message needs a body or a reference"));
        }
        if self.store.find_user(recipient_id).await?.is_none() {
            return Err(Error::not_found("user", recipient_id));
        }

        let reference = match reference {
            Some(id) => {
                let target = self.resolver.resolve_content(id).await?;
                let kind = target.kind().content_kind().ok_or_else(|| {
                    Error::validation("messages can only reference blogs, posts or products")
                })?;
                Some(MessageReference {
                    kind,
                    id: target.id().to_string(),
                })
            }
            None => None,
        };

        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
            reference,
            created_at: Utc::now(),
        };

        self.store.insert_message(&message).await?;
        info!(message_id = %message.id, "message sent");
        Ok(message)
    }
}
