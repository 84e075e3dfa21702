//! Room API handlers.
//!
//! Listing rooms is public; matchmaking, creating private rooms and
//! resolving a room code require a bearer token. None of these seat the
//! caller: they return the room to open a WebSocket against, and the seat
//! is taken when that socket joins.
//!
//! # Examples
//!
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/rooms/join \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"code": "K7Q2ZD"}'
//! ```

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use teen_patti::room::{RoomError, RoomHandle, RoomId, RoomSummary};
use tracing::info;

use super::{AppState, auth::Claims};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct JoinByCodeRequest {
    pub code: String,
}

/// Where a client should connect
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomAssignment {
    pub room_id: RoomId,
    /// Join code, for private rooms
    pub code: Option<String>,
    pub max_seats: usize,
    /// WebSocket path for this room, token not included
    pub ws_path: String,
}

impl From<&RoomHandle> for RoomAssignment {
    fn from(handle: &RoomHandle) -> Self {
        Self {
            room_id: handle.room_id(),
            code: handle.code().map(str::to_string),
            max_seats: handle.max_seats(),
            ws_path: format!("/ws/{}", handle.room_id()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// REST error with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        let status = match &err {
            RoomError::NotFound(_) => StatusCode::NOT_FOUND,
            RoomError::Validation(_) => StatusCode::CONFLICT,
            RoomError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            RoomError::Ledger(_) | RoomError::Card(_) | RoomError::Fatal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.client_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn record_room_metrics(state: &AppState) {
    metrics::rooms_created_total(state.room_manager.rooms_spawned());
    metrics::active_rooms(state.room_manager.room_count().await);
}

/// List public rooms.
///
/// # Response
///
/// ```json
/// [{"room_id": 1, "is_private": false, "players": 2, "bots": 1, "max_seats": 5, "phase": "betting"}]
/// ```
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.room_manager.list_rooms().await)
}

/// Find a public room with a free seat, spawning one if none is open.
pub async fn matchmake(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<RoomAssignment> {
    metrics::matchmaking_requests_total();

    let handle = state.room_manager.find_or_create_public().await;
    info!(
        user_id = claims.sub,
        room_id = handle.room_id(),
        "Matchmade user"
    );
    record_room_metrics(&state).await;

    Json(RoomAssignment::from(&handle))
}

/// Spawn a private room and return its join code.
pub async fn create_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> (StatusCode, Json<RoomAssignment>) {
    let handle = state.room_manager.create_private().await;
    info!(
        user_id = claims.sub,
        room_id = handle.room_id(),
        "Created private room"
    );
    record_room_metrics(&state).await;

    (StatusCode::CREATED, Json(RoomAssignment::from(&handle)))
}

/// Resolve a private room code.
///
/// Returns `404 Not Found` for an unknown code and `409 Conflict` when the
/// room has no free seat.
pub async fn join_by_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<JoinByCodeRequest>,
) -> Result<Json<RoomAssignment>, ApiError> {
    let handle = state.room_manager.join_by_code(&request.code).await?;
    info!(
        user_id = claims.sub,
        room_id = handle.room_id(),
        "Resolved room code"
    );
    Ok(Json(RoomAssignment::from(&handle)))
}
