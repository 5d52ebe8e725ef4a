use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tracing::{info, warn};

use crate::common::errors::CommandError;
use crate::protocol::commands::Command;
use crate::protocol::events::OutgoingMessage;
use crate::protocol::models::Participant;
use crate::server::AppState;

/// One socket, one participant, one session. Joining happens on connect;
/// dropping the socket only marks the participant offline, an explicit
/// `leave` op removes them.
pub async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    code: String,
    participant: Participant,
) {
    let participant_id = participant.id.clone();

    let subscription = match state.manager.attach(&code, participant).await {
        Ok(sub) => sub,
        Err(err) => {
            // Join rejections (bad code, full session) close the socket
            // after a single error frame.
            send_error(&mut socket, &err).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    info!(
        code = %code,
        participant = %participant_id,
        resumed = subscription.resumed,
        "websocket attached"
    );

    let mut left = false;
    loop {
        tokio::select! {
            outgoing = subscription.stream.recv_async() => {
                let Ok(event) = outgoing else {
                    // Channel gone: the session was destroyed.
                    break;
                };
                let ended = matches!(event, OutgoingMessage::SessionEnded { .. });
                if let Ok(json) = serde_json::to_string(&event) {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                if ended {
                    left = true;
                    break;
                }
            }
            incoming = socket.recv() => {
                let msg = match incoming {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(code = %code, participant = %participant_id, err = %e, "websocket error");
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<Command>(&text) {
                            Ok(command) => {
                                let is_leave = matches!(command, Command::Leave);
                                if let Err(err) = state
                                    .manager
                                    .handle_command(&code, &participant_id, command)
                                    .await
                                {
                                    send_error(&mut socket, &err).await;
                                }
                                if is_leave {
                                    left = true;
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(code = %code, participant = %participant_id, err = %e, "bad command");
                                let err = CommandError::InvalidArgument(
                                    "unrecognized command".into(),
                                );
                                send_error(&mut socket, &err).await;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    // Presence flips only if this connection still owns the seat; a
    // reconnect that already replaced us makes this a no-op.
    state
        .manager
        .detach(&code, &participant_id, subscription.connection)
        .await;
    info!(code = %code, participant = %participant_id, left, "websocket detached");
}

/// Command rejections go back on the issuing socket only.
async fn send_error(socket: &mut WebSocket, err: &CommandError) {
    let event = OutgoingMessage::Error {
        error: err.kind().to_string(),
        message: err.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
}
