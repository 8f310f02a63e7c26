//! HTTP API
//!
//! REST endpoints over the feed, destination and interaction services. The
//! caller's identity arrives in the `x-user-id` header, set by the gateway in
//! front of this service.

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, Path, State},
    http::{request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::AuthContext;
use crate::config::{ApiConfig, Config};
use crate::destination::{DestinationResolver, DestinationTarget};
use crate::error::Result;
use crate::feed::{FeedEngine, FeedEntry, FeedOptions};
use crate::interactions::InteractionService;
use crate::models::{Comment, Event, EventKind, FollowEdge, Message};
use crate::social::FollowService;
use crate::store::EntityStore;

pub const CALLER_HEADER: &str = "x-user-id";

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub feed: FeedEngine,
    pub resolver: DestinationResolver,
    pub follows: FollowService,
    pub interactions: InteractionService,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, options: FeedOptions) -> Self {
        Self {
            feed: FeedEngine::new(store.clone(), options),
            resolver: DestinationResolver::new(store.clone()),
            follows: FollowService::new(store.clone()),
            interactions: InteractionService::new(store.clone()),
            store,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        Ok(match caller {
            Some(id) => AuthContext::for_user(id),
            None => AuthContext::anonymous(),
        })
    }
}

// ============================================================================
// Request and response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<FeedEntry>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub to: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub to: String,
    pub kind: EventKind,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub recipient_id: String,
    #[serde(default)]
    pub body: String,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: Arc<AppState>, config: &ApiConfig) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/feed/:user_id", get(get_feed))
        .route("/api/v1/destinations/:id", get(resolve_destination))
        .route("/api/v1/follows", post(send_follow_request))
        .route("/api/v1/follows/:edge_id/accept", post(accept_follow_request))
        .route("/api/v1/comments", post(post_comment))
        .route("/api/v1/events", post(post_event))
        .route("/api/v1/messages", post(send_message))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state);

    if config.cors_enabled {
        app.layer(cors_layer(&config.cors_origins))
    } else {
        app
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    base.allow_origin(parsed)
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn start_server(
    state: Arc<AppState>,
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = router(state, &config.api);
    let addr = format!("{}:{}", config.api.host, config.api.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(crate::error::Error::internal)?;
    info!("Starting API server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(crate::error::Error::internal)?;

    info!("API server stopped");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let (status, label) = match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
        .into_response()
}

async fn get_feed(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(user_id): Path<String>,
) -> Result<Json<FeedResponse>> {
    let items = state.feed.get_feed(&ctx, &user_id).await?;
    Ok(Json(FeedResponse {
        total: items.len(),
        items,
    }))
}

async fn resolve_destination(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<DestinationTarget>> {
    crate::auth::require_authenticated(&ctx)?;
    Ok(Json(state.resolver.resolve(&id).await?))
}

async fn send_follow_request(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(req): Json<FollowRequest>,
) -> Result<(StatusCode, Json<FollowEdge>)> {
    let edge = state.follows.send_follow_request(&ctx, &req.user_id).await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn accept_follow_request(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(edge_id): Path<String>,
) -> Result<Json<FollowEdge>> {
    Ok(Json(
        state.follows.accept_follow_request(&ctx, &edge_id).await?,
    ))
}

async fn post_comment(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = state
        .interactions
        .post_comment(&ctx, &req.to, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn post_event(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(req): Json<EventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.interactions.post_event(&ctx, &req.to, req.kind).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(req): Json<MessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let message = state
        .interactions
        .send_message(&ctx, &req.recipient_id, &req.body, req.reference.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, Engagement, Post, User};
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn api_config() -> ApiConfig {
        ApiConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            request_timeout: Duration::from_secs(5),
            max_body_size: 64 * 1024,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }

    async fn app() -> Router {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                id: "alice".to_string(),
                username: "alice".to_string(),
                verified: true,
                created_at: Utc::now(),
            })
            .await;
        store
            .insert_content(ContentItem::Post(Post {
                id: "p1".to_string(),
                owner_id: "alice".to_string(),
                caption: "hello".to_string(),
                media_url: None,
                tagged_users: vec![],
                blocked: false,
                engagement: Engagement::default(),
                created_at: Utc::now(),
            }))
            .await;

        let state = Arc::new(AppState::new(Arc::new(store), FeedOptions::default()));
        router(state, &api_config())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_feed_requires_caller_header() {
        let response = app()
            .await
            .oneshot(
                Request::get("/api/v1/feed/alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_feed_for_self() {
        let response = app()
            .await
            .oneshot(
                Request::get("/api/v1/feed/alice")
                    .header(CALLER_HEADER, "alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["kind"], "post");
        assert_eq!(body["items"][0]["payload"]["id"], "p1");
    }

    #[tokio::test]
    async fn test_unknown_destination_is_404() {
        let response = app()
            .await
            .oneshot(
                Request::get("/api/v1/destinations/missing")
                    .header(CALLER_HEADER, "alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comment_created() {
        let response = app()
            .await
            .oneshot(
                Request::post("/api/v1/comments")
                    .header(CALLER_HEADER, "alice")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"to":"p1","body":"first"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["target_kind"], "post");
        assert_eq!(body["target_id"], "p1");
    }
}
