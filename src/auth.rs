//! Caller authorization
//!
//! Identity is established upstream; by the time a request reaches the engine
//! the caller id is either present or absent. These checks fail fast and never
//! let a request continue on a weaker identity.

use crate::error::{Error, Result};
use crate::models::User;
use crate::store::EntityStore;

/// Identity attached to one request
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    caller_id: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            caller_id: Some(user_id.into()),
        }
    }

    pub fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }
}

pub fn require_authenticated(ctx: &AuthContext) -> Result<&str> {
    match ctx.caller_id() {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(Error::unauthenticated("a signed-in caller is required")),
    }
}

pub fn require_self(caller_id: &str, user_id: &str) -> Result<()> {
    if caller_id != user_id {
        return Err(Error::forbidden("callers may only act on their own account"));
    }
    Ok(())
}

/// Loads the caller's account. An id with no account is not an identity.
pub async fn require_existing(store: &dyn EntityStore, caller_id: &str) -> Result<User> {
    store
        .find_user(caller_id)
        .await?
        .ok_or_else(|| Error::unauthenticated("caller account does not exist"))
}

/// Authenticated with an account behind the id, verified or not
pub async fn require_known_caller(store: &dyn EntityStore, ctx: &AuthContext) -> Result<User> {
    let caller_id = require_authenticated(ctx)?;
    require_existing(store, caller_id).await
}

/// Loads the caller's account and checks it has been verified
pub async fn require_verified(store: &dyn EntityStore, caller_id: &str) -> Result<User> {
    let user = require_existing(store, caller_id).await?;

    if !user.verified {
        return Err(Error::forbidden("account must be verified"));
    }
    Ok(user)
}

/// Authenticated and verified, in that order
pub async fn require_verified_caller(store: &dyn EntityStore, ctx: &AuthContext) -> Result<User> {
    let caller_id = require_authenticated(ctx)?;
    require_verified(store, caller_id).await
}
