use serde::{Deserialize, Serialize};

use crate::common::types::{ParticipantId, TrackId, now_ms};

/// Track metadata as queued and displayed. No audio data, only what the
/// UI needs to render a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artwork: Option<String>,
    /// Duration in milliseconds.
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Unix timestamp in milliseconds. Join order decides host eligibility.
    pub joined_at: u64,
    pub is_online: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: String, avatar_url: Option<String>) -> Self {
        Self {
            id,
            display_name,
            avatar_url,
            joined_at: now_ms(),
            is_online: true,
        }
    }
}

/// One entry in the shared queue. `id` is unique per entry so the same
/// track may be queued twice and still removed individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub track_id: TrackId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artwork: Option<String>,
    pub duration: u64,
    pub added_by_id: ParticipantId,
    pub added_by_name: String,
    pub added_at: u64,
}

impl QueueItem {
    pub fn new(track: Track, added_by_id: ParticipantId, added_by_name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            track_id: track.id,
            title: track.title,
            artist: track.artist,
            artwork: track.artwork,
            duration: track.duration,
            added_by_id,
            added_by_name,
            added_at: now_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: ParticipantId,
    pub sender_name: String,
    pub text: String,
    pub sent_at: u64,
    /// True for machine-generated lines like "X joined the session".
    #[serde(default)]
    pub is_system: bool,
}

impl ChatMessage {
    pub fn new(sender_id: ParticipantId, sender_name: String, text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id,
            sender_name,
            text,
            sent_at: now_ms(),
            is_system: false,
        }
    }

    pub fn system(text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: crate::common::types::SYSTEM_SENDER.to_string(),
            sender_name: "System".to_string(),
            text,
            sent_at: now_ms(),
            is_system: true,
        }
    }
}

/// Ephemeral emoji event. Lives only for the configured display window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: String,
    pub sender_id: ParticipantId,
    pub emoji: String,
    pub sent_at: u64,
}

impl Reaction {
    pub fn new(sender_id: ParticipantId, emoji: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id,
            emoji,
            sent_at: now_ms(),
        }
    }
}

/// Complete session state, sent on (re)subscribe so a client converges
/// regardless of how many deltas it missed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_code: String,
    pub host_id: ParticipantId,
    /// Denormalized so the UI can show the host while they are offline.
    pub host_name: String,
    #[serde(default)]
    pub host_avatar: Option<String>,
    /// Ordered by join time.
    pub participants: Vec<Participant>,
    pub queue: Vec<QueueItem>,
    pub playback: crate::session::clock::PlaybackClock,
    pub chat: Vec<ChatMessage>,
    pub reactions: Vec<Reaction>,
    pub created_at: u64,
    pub expires_at: u64,
}
