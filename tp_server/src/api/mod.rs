//! HTTP/WebSocket API for the Teen Patti server.
//!
//! # Modules
//!
//! - [`auth`]: Verification of identity tokens issued by the identity service
//! - [`rooms`]: Room listing, matchmaking and private room codes
//! - [`websocket`]: Live room connections
//! - [`middleware`]: Authentication middleware for protected endpoints
//! - [`rate_limiter`]: Per-connection frame limits
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                         - Health check (public)
//! GET  /api/v1/rooms                   - List public rooms (public)
//! POST /api/v1/rooms/matchmake         - Find or spawn a public room (auth required)
//! POST /api/v1/rooms/private           - Spawn a private room (auth required)
//! POST /api/v1/rooms/join              - Resolve a private room code (auth required)
//! GET  /ws/{room_id}?token=<jwt>       - WebSocket (auth required)
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod middleware;
pub mod rate_limiter;
pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use teen_patti::{db::Database, room::RoomManager};
use tower_http::cors::CorsLayer;

use auth::TokenVerifier;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub room_manager: Arc<RoomManager>,
    pub verifier: Arc<TokenVerifier>,
    /// Present when coins and history are kept in PostgreSQL
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use tp_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    // WebSocket route handles its own auth via query parameter
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{room_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new().route("/rooms", get(rooms::list_rooms));

    let protected_routes = Router::new()
        .route("/rooms/matchmake", post(rooms::matchmake))
        .route("/rooms/private", post(rooms::create_private))
        .route("/rooms/join", post(rooms::join_by_code))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if all components are healthy, or
/// `503 Service Unavailable` if the database does not answer.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","database":null,"rooms":2,"timestamp":"2026-01-22T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(database) => Some(database.health_check().await.is_ok()),
        None => None,
    };
    let rooms = state.room_manager.room_count().await;

    let overall_healthy = db_healthy.unwrap_or(true);
    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "rooms": rooms,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
