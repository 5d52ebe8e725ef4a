use std::sync::Arc;

use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::protocol::models::Participant;
use crate::server::AppState;

pub mod handler;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Invite code of the session to join.
    pub code: String,
}

/// Upgrade endpoint. Identity comes from headers, the target session
/// from the query string; joining needs nothing more than that.
pub async fn websocket_handler(
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let participant_id = headers
        .get("participant-id")
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or((StatusCode::BAD_REQUEST, "Missing Participant-Id header"))?;

    let display_name = headers
        .get("participant-name")
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or((StatusCode::BAD_REQUEST, "Missing Participant-Name header"))?;

    let avatar_url = headers
        .get("participant-avatar")
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let participant = Participant::new(participant_id, display_name, avatar_url);
    Ok(ws.on_upgrade(move |socket| handler::handle_socket(socket, state, params.code, participant)))
}
