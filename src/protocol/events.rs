use serde::{Deserialize, Serialize};

use crate::common::types::ParticipantId;
use crate::protocol::models::{ChatMessage, Participant, QueueItem, Reaction, SessionSnapshot};
use crate::session::clock::PlaybackClock;

/// Everything the server sends down a subscriber's socket. `Ready`,
/// `Snapshot` and `Error` frame the stream; the rest are state deltas,
/// delivered in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
#[serde(rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum OutgoingMessage {
    /// First frame after a successful (re)connect.
    Ready {
        session_code: String,
        participant_id: ParticipantId,
        resumed: bool,
    },
    /// Full state, causally consistent with the deltas that follow it.
    Snapshot { session: SessionSnapshot },
    /// Command rejection, sent only to the issuing participant.
    Error {
        error: String,
        message: String,
    },

    PlaybackChanged { playback: PlaybackClock },
    /// Whole-queue replacement. Queue mutations are rare enough that a
    /// positional patch format is not worth the convergence risk.
    QueueUpdated {
        queue: Vec<QueueItem>,
        playback: PlaybackClock,
    },
    ParticipantJoined { participant: Participant },
    ParticipantLeft { participant_id: ParticipantId },
    PresenceChanged {
        participant_id: ParticipantId,
        is_online: bool,
    },
    HostChanged {
        host_id: ParticipantId,
        host_name: String,
    },
    Chat { message: ChatMessage },
    Reaction { reaction: Reaction },
    /// Terminal. The session is gone for everyone.
    SessionEnded { reason: String },
}

impl OutgoingMessage {
    /// Deltas mutate projection state; framing messages do not.
    pub fn is_delta(&self) -> bool {
        !matches!(
            self,
            Self::Ready { .. } | Self::Snapshot { .. } | Self::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_op_tag() {
        let msg = OutgoingMessage::PresenceChanged {
            participant_id: "u2".into(),
            is_online: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["op"], "presenceChanged");
        assert_eq!(json["isOnline"], false);
    }

    #[test]
    fn framing_messages_are_not_deltas() {
        let ready = OutgoingMessage::Ready {
            session_code: "123456".into(),
            participant_id: "u1".into(),
            resumed: false,
        };
        assert!(!ready.is_delta());
        let ended = OutgoingMessage::SessionEnded {
            reason: "host left".into(),
        };
        assert!(ended.is_delta());
    }
}
