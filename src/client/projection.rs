use crate::common::types::ParticipantId;
use crate::protocol::events::OutgoingMessage;
use crate::protocol::models::{ChatMessage, Participant, QueueItem, Reaction, SessionSnapshot};

/// Retention mirrors the server defaults, so an always-connected client
/// holds no more than a freshly-snapshotted one.
const CHAT_VIEW_CAPACITY: usize = 50;
const REACTION_VIEW_CAPACITY: usize = 20;
const REACTION_VIEW_WINDOW_MS: u64 = 4_000;

/// The finite states a client can observe, with the snapshot as payload
/// rather than implicit booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Host is setting the session up, nothing received yet.
    Creating,
    /// Guest sent a code, waiting for snapshot or rejection.
    Joining,
    /// Host alone, invite code on display.
    WaitingForGuest { session: SessionSnapshot },
    Active {
        session: SessionSnapshot,
        is_host: bool,
    },
    /// Terminal: left voluntarily or the session ended.
    Left { reason: String },
    /// Terminal locally, recoverable by reconnecting.
    Error { message: String },
}

/// Read-only view a participant's UI renders. Rebuilt from the broadcast
/// stream; the only local mutation is the drag-to-seek preview, which is
/// discarded on release in favor of the server-confirmed position.
/// Presentation side effects (animations, haptics) belong to whoever
/// observes this projection, never to the session engine.
#[derive(Debug, Clone)]
pub struct ClientProjection {
    own_id: ParticipantId,
    phase: SessionPhase,
    seek_preview: Option<f64>,
    /// Last command rejection, for the UI to toast. Not part of the
    /// shared state and excluded from convergence.
    last_error: Option<String>,
    /// Backgrounded UI. Not a state transition; the session engine is
    /// indifferent to it.
    minimized: bool,
}

impl ClientProjection {
    pub fn creating(own_id: ParticipantId) -> Self {
        Self {
            own_id,
            phase: SessionPhase::Creating,
            seek_preview: None,
            last_error: None,
            minimized: false,
        }
    }

    pub fn joining(own_id: ParticipantId) -> Self {
        Self {
            own_id,
            phase: SessionPhase::Joining,
            seek_preview: None,
            last_error: None,
            minimized: false,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn own_id(&self) -> &str {
        &self.own_id
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_host(&self) -> bool {
        match &self.phase {
            SessionPhase::WaitingForGuest { session } | SessionPhase::Active { session, .. } => {
                session.host_id == self.own_id
            }
            _ => false,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        match self.session() {
            Some(s) => s.participants.as_slice(),
            None => &[],
        }
    }

    pub fn queue(&self) -> &[QueueItem] {
        match self.session() {
            Some(s) => s.queue.as_slice(),
            None => &[],
        }
    }

    pub fn current_track(&self) -> Option<&QueueItem> {
        self.session().and_then(|s| s.queue.first())
    }

    pub fn chat(&self) -> &[ChatMessage] {
        match self.session() {
            Some(s) => s.chat.as_slice(),
            None => &[],
        }
    }

    pub fn reactions(&self) -> &[Reaction] {
        match self.session() {
            Some(s) => s.reactions.as_slice(),
            None => &[],
        }
    }

    /// Progress to render at `now_ms`: the drag preview while the thumb
    /// is held, otherwise the extrapolated shared timeline.
    pub fn progress(&self, now_ms: u64) -> f64 {
        if let Some(preview) = self.seek_preview {
            return preview;
        }
        self.session()
            .map_or(0.0, |s| s.playback.extrapolate(now_ms))
    }

    /// Local-only drag preview. Nothing is sent until release.
    pub fn begin_seek_preview(&mut self, fraction: f64) {
        self.seek_preview = Some(fraction.clamp(0.0, 1.0));
    }

    /// Release the thumb: the preview is discarded and rendering falls
    /// back to the server-confirmed value.
    pub fn end_seek_preview(&mut self) {
        self.seek_preview = None;
    }

    /// Background the session UI. The session stays alive; nothing is
    /// sent anywhere.
    pub fn minimize(&mut self) {
        self.minimized = true;
    }

    pub fn resume(&mut self) {
        self.minimized = false;
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Drop reactions past their display window. The render tick calls
    /// this so reactions also disappear when no new ones arrive.
    pub fn prune_reactions(&mut self, now_ms: u64) {
        if let Some(session) = self.session_mut() {
            let horizon = now_ms.saturating_sub(REACTION_VIEW_WINDOW_MS);
            session.reactions.retain(|r| r.sent_at >= horizon);
        }
    }

    /// Transport gave out. Session state survives server-side; the UI
    /// offers retry or leave.
    pub fn transport_failed(&mut self, message: impl Into<String>) {
        self.phase = SessionPhase::Error {
            message: message.into(),
        };
    }

    pub fn left(&mut self) {
        self.phase = SessionPhase::Left {
            reason: "left the session".into(),
        };
    }

    /// Fold one server message into the view.
    pub fn apply(&mut self, message: &OutgoingMessage) {
        match message {
            OutgoingMessage::Ready { .. } => {}
            OutgoingMessage::Snapshot { session } => {
                self.install(session.clone());
            }
            OutgoingMessage::Error { message, .. } => {
                self.last_error = Some(message.clone());
            }
            OutgoingMessage::SessionEnded { reason } => {
                self.phase = SessionPhase::Left {
                    reason: reason.clone(),
                };
            }
            delta => {
                let own_id = self.own_id.clone();
                if let Some(session) = self.session_mut() {
                    Self::fold(session, delta);
                    let snapshot = session.clone();
                    self.install_with(snapshot, &own_id);
                }
            }
        }
    }

    fn install(&mut self, session: SessionSnapshot) {
        let own_id = self.own_id.clone();
        self.install_with(session, &own_id);
    }

    /// Phase is derived from the snapshot: one participant means the host
    /// is waiting, more means active.
    fn install_with(&mut self, session: SessionSnapshot, own_id: &str) {
        self.phase = if session.participants.len() <= 1 {
            SessionPhase::WaitingForGuest { session }
        } else {
            let is_host = session.host_id == own_id;
            SessionPhase::Active { session, is_host }
        };
    }

    fn fold(session: &mut SessionSnapshot, delta: &OutgoingMessage) {
        match delta {
            OutgoingMessage::PlaybackChanged { playback } => {
                session.playback = playback.clone();
            }
            OutgoingMessage::QueueUpdated { queue, playback } => {
                session.queue = queue.clone();
                session.playback = playback.clone();
            }
            OutgoingMessage::ParticipantJoined { participant } => {
                // Idempotent: the snapshot may already include a join the
                // stream replays.
                if !session.participants.iter().any(|p| p.id == participant.id) {
                    session.participants.push(participant.clone());
                    session.participants.sort_by_key(|p| p.joined_at);
                }
            }
            OutgoingMessage::ParticipantLeft { participant_id } => {
                session.participants.retain(|p| p.id != *participant_id);
            }
            OutgoingMessage::PresenceChanged {
                participant_id,
                is_online,
            } => {
                if let Some(p) = session
                    .participants
                    .iter_mut()
                    .find(|p| p.id == *participant_id)
                {
                    p.is_online = *is_online;
                }
            }
            OutgoingMessage::HostChanged { host_id, host_name } => {
                session.host_id = host_id.clone();
                session.host_name = host_name.clone();
                session.host_avatar = session
                    .participants
                    .iter()
                    .find(|p| p.id == *host_id)
                    .and_then(|p| p.avatar_url.clone());
            }
            OutgoingMessage::Chat { message } => {
                if !session.chat.iter().any(|m| m.id == message.id) {
                    session.chat.push(message.clone());
                }
                if session.chat.len() > CHAT_VIEW_CAPACITY {
                    let overflow = session.chat.len() - CHAT_VIEW_CAPACITY;
                    session.chat.drain(..overflow);
                }
            }
            OutgoingMessage::Reaction { reaction } => {
                if !session.reactions.iter().any(|r| r.id == reaction.id) {
                    session.reactions.push(reaction.clone());
                }
                // The incoming timestamp stands in for "now": anything
                // already past its window relative to the newest reaction
                // will never be shown again.
                let horizon = reaction.sent_at.saturating_sub(REACTION_VIEW_WINDOW_MS);
                session.reactions.retain(|r| r.sent_at >= horizon);
                if session.reactions.len() > REACTION_VIEW_CAPACITY {
                    let overflow = session.reactions.len() - REACTION_VIEW_CAPACITY;
                    session.reactions.drain(..overflow);
                }
            }
            _ => {}
        }
    }

    fn session(&self) -> Option<&SessionSnapshot> {
        match &self.phase {
            SessionPhase::WaitingForGuest { session } | SessionPhase::Active { session, .. } => {
                Some(session)
            }
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut SessionSnapshot> {
        match &mut self.phase {
            SessionPhase::WaitingForGuest { session } | SessionPhase::Active { session, .. } => {
                Some(session)
            }
            _ => None,
        }
    }
}
