//! Agora library crate
//!
//! Feed assembly and cross-collection destination resolution, plus the store,
//! config and HTTP layers the binary is built from.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod destination;
pub mod error;
pub mod feed;
pub mod interactions;
pub mod models;
pub mod social;
pub mod store;
pub mod telemetry;

pub use auth::AuthContext;
pub use config::Config;
pub use database::Database;
pub use destination::{DestinationResolver, DestinationTarget};
pub use error::{Error, Result};
pub use feed::{FeedEngine, FeedEntry, FeedOptions};
pub use store::{EntityStore, MemoryStore};
