//! Follow requests
//!
//! Edges are created pending and become visible to the follower's feed only
//! once the followed user accepts them.

use crate::auth::{require_authenticated, require_verified, AuthContext};
use crate::error::{Error, Result};
use crate::models::FollowEdge;
use crate::store::{EdgeFilter, EntityStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn EntityStore>,
}

impl FollowService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Caller asks to follow `user_id`
    #[instrument(skip(self, ctx))]
    pub async fn send_follow_request(&self, ctx: &AuthContext, user_id: &str) -> Result<FollowEdge> {
        let caller_id = require_authenticated(ctx)?;
        require_verified(self.store.as_ref(), caller_id).await?;

        if caller_id == user_id {
            return Err(Error::validation("users cannot follow themselves"));
        }
        if self.store.find_user(user_id).await?.is_none() {
            return Err(Error::not_found("user", user_id));
        }

        let existing = self
            .store
            .find_follow_edges(&EdgeFilter::pair(user_id, caller_id))
            .await?;
        if !existing.is_empty() {
            return Err(Error::conflict(format!(
                "a follow request to {} already exists",
                user_id
            )));
        }

        let edge = FollowEdge::request(user_id, caller_id);
        self.store.insert_follow_edge(&edge).await?;
        info!(edge_id = %edge.id, follower_id = caller_id, user_id, "follow requested");
        Ok(edge)
    }

    /// The followed user accepts a pending request
    #[instrument(skip(self, ctx))]
    pub async fn accept_follow_request(&self, ctx: &AuthContext, edge_id: &str) -> Result<FollowEdge> {
        let caller_id = require_authenticated(ctx)?;

        let edge = self
            .store
            .find_follow_edge(edge_id)
            .await?
            .ok_or_else(|| Error::not_found("follow_edge", edge_id))?;

        if edge.user_id != caller_id {
            return Err(Error::forbidden(
                "only the followed user can accept a follow request",
            ));
        }
        if edge.accepted {
            return Err(Error::conflict("follow request already accepted"));
        }

        let edge = self.store.accept_follow_edge(edge_id, Utc::now()).await?;
        info!(edge_id, follower_id = %edge.follower_id, "follow accepted");
        Ok(edge)
    }
}
