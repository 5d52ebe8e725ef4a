use serde::Deserialize;

use crate::protocol::models::Track;

/// Commands a participant may issue while connected. Join and leave are
/// carried by the transport itself: connecting with a code joins, an
/// explicit `leave` op (or dropping the socket) leaves.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op")]
#[serde(rename_all = "camelCase")]
pub enum Command {
    /// Toggle play/pause. Host only.
    PlayPause,
    /// Jump to a position. Host only. `fraction` must be within [0, 1].
    Seek { fraction: f64 },
    /// Advance the queue. Host only. On a single-item queue this restarts
    /// the current track instead of erroring.
    SkipNext,
    /// Replay the previous track if history has one, else restart. Host only.
    SkipPrevious,
    /// Append a track. Any participant. Duplicates are allowed.
    AddToQueue { track: Track },
    /// Remove a queued item by index. Host may remove anything except
    /// index 0 (now playing); guests may only remove their own items.
    RemoveFromQueue { index: usize },
    /// Non-empty chat text. Any participant, rate limited.
    SendChat { text: String },
    /// Ephemeral emoji. Any participant.
    SendReaction { emoji: String },
    /// Leave the session for good (as opposed to a transport drop, which
    /// only marks the participant offline).
    Leave,
}
