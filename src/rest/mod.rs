use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::common::errors::ErrorResponse;
use crate::protocol::models::{Participant, Track};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub host: HostIdentity,
    /// The track the host is listening to; it seeds the queue so index 0
    /// is occupied from the first snapshot.
    pub first_track: Track,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostIdentity {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_code: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/{code}", get(get_session))
}

/// Create a session and hand the invite code back. The host connects to
/// the websocket with this code afterwards, like any participant.
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let host = Participant::new(body.host.id, body.host.display_name, body.host.avatar_url);
    let session_code = state.manager.create_session(host, body.first_track);
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_code }),
    )
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.manager.snapshot(&code).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse::from(&err))).into_response()
        }
    }
}
