use tracing::{debug, info};

use crate::common::errors::CommandError;
use crate::common::types::{ParticipantId, SessionCode, now_ms};
use crate::config::{HostLeavePolicy, LimitsConfig, SessionConfig};
use crate::protocol::commands::Command;
use crate::protocol::events::OutgoingMessage;
use crate::protocol::models::{
    ChatMessage, Participant, QueueItem, Reaction, SessionSnapshot, Track,
};
use crate::session::chat::{ChatLog, RateLimiter, ReactionWindow};
use crate::session::clock::PlaybackClock;
use crate::session::queue::{JamQueue, SkipOutcome};
use crate::session::registry::ParticipantRegistry;

/// Server-side lifecycle. `Creating`/`Joining`/`Error` are client-side
/// phases; once a machine exists it is waiting, active, or gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// Host alone, invite code on display.
    WaitingForGuest,
    /// At least one guest has joined.
    Active,
    /// Terminal; the session manager drops the machine after this.
    Ended,
}

/// The session state machine. Sole mutator of the registry, queue, clock,
/// chat log and reaction window it owns. Callers serialize commands per
/// session (one lock per machine); every mutation returns the deltas to
/// broadcast, in commit order.
pub struct SessionMachine {
    code: SessionCode,
    state: MachineState,
    host_id: ParticipantId,
    /// Denormalized so the UI can name the host even while they are offline.
    host_name: String,
    host_avatar: Option<String>,
    registry: ParticipantRegistry,
    queue: JamQueue,
    clock: PlaybackClock,
    chat: ChatLog,
    chat_limiter: RateLimiter,
    reactions: ReactionWindow,
    created_at: u64,
    expires_at: u64,
    max_participants: usize,
    host_leave_policy: HostLeavePolicy,
}

impl SessionMachine {
    pub fn new(
        code: SessionCode,
        host: Participant,
        first_track: Track,
        session_cfg: &SessionConfig,
        limits: &LimitsConfig,
    ) -> Self {
        let now = now_ms();
        let mut clock = PlaybackClock::new(now);
        clock.load(first_track.id.clone(), first_track.duration, now);
        clock.is_playing = true;

        let first_item = QueueItem::new(first_track, host.id.clone(), host.display_name.clone());
        let mut registry = ParticipantRegistry::new();
        let (host_id, host_name, host_avatar) =
            (host.id.clone(), host.display_name.clone(), host.avatar_url.clone());
        registry.add(host);

        info!(code = %code, host = %host_id, "session created");

        Self {
            code,
            state: MachineState::WaitingForGuest,
            host_id,
            host_name,
            host_avatar,
            registry,
            queue: JamQueue::new(first_item),
            clock,
            chat: ChatLog::new(limits.chat_capacity),
            chat_limiter: RateLimiter::new(limits.chat_burst, limits.chat_window_ms),
            reactions: ReactionWindow::new(limits.reaction_window_ms, limits.reaction_capacity),
            created_at: now,
            expires_at: now + session_cfg.ttl_ms,
            max_participants: session_cfg.max_participants,
            host_leave_policy: session_cfg.host_leave_policy,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn is_host(&self, id: &str) -> bool {
        self.host_id == id
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    /// Full state for a fresh subscriber. Always taken under the same
    /// lock that serializes commands, so it is causally consistent with
    /// the delta stream that follows.
    pub fn snapshot(&self, now: u64) -> SessionSnapshot {
        SessionSnapshot {
            session_code: self.code.clone(),
            host_id: self.host_id.clone(),
            host_name: self.host_name.clone(),
            host_avatar: self.host_avatar.clone(),
            participants: self.registry.list(),
            queue: self.queue.items(),
            playback: self.clock.clone(),
            chat: self.chat.messages(),
            reactions: self.reactions.active(now),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    /// Admit a participant. Idempotent for ids already present: they are
    /// marked online and the caller treats it as a resume.
    pub fn join(&mut self, participant: Participant) -> Result<JoinOutcome, CommandError> {
        if self.state == MachineState::Ended {
            return Err(CommandError::NotFound("session has ended".into()));
        }
        if self.is_expired(now_ms()) {
            return Err(CommandError::NotFound("session has expired".into()));
        }
        if self.registry.contains(&participant.id) {
            let deltas = self.presence(&participant.id, true);
            return Ok(JoinOutcome { resumed: true, deltas });
        }
        if self.registry.len() >= self.max_participants {
            return Err(CommandError::InvalidOperation(format!(
                "session is full ({} participants max)",
                self.max_participants
            )));
        }

        let mut deltas = Vec::new();
        let name = participant.display_name.clone();
        self.registry.add(participant.clone());
        if self.state == MachineState::WaitingForGuest {
            self.state = MachineState::Active;
        }
        deltas.push(OutgoingMessage::ParticipantJoined { participant });
        deltas.push(self.push_system_chat(format!("{name} joined the session")));
        info!(code = %self.code, participants = self.registry.len(), "participant joined");
        Ok(JoinOutcome { resumed: false, deltas })
    }

    /// Transport drop: flip presence, keep the record and host eligibility.
    pub fn mark_offline(&mut self, id: &str) -> Vec<OutgoingMessage> {
        self.presence(id, false)
    }

    pub fn mark_online(&mut self, id: &str) -> Vec<OutgoingMessage> {
        self.presence(id, true)
    }

    fn presence(&mut self, id: &str, online: bool) -> Vec<OutgoingMessage> {
        let changed = if online {
            self.registry.mark_online(id)
        } else {
            self.registry.mark_offline(id)
        };
        if !changed {
            return Vec::new(); // idempotent, no duplicate deltas
        }
        vec![OutgoingMessage::PresenceChanged {
            participant_id: id.to_string(),
            is_online: online,
        }]
    }

    /// Validate and apply one command. Total: every input has a defined
    /// accept/reject outcome, and a rejection produces no delta.
    pub fn apply(
        &mut self,
        caller: &str,
        command: Command,
    ) -> Result<Vec<OutgoingMessage>, CommandError> {
        if self.state == MachineState::Ended {
            return Err(CommandError::NotFound("session has ended".into()));
        }
        if !self.registry.contains(caller) {
            return Err(CommandError::Unauthorized(format!(
                "participant {caller} is not in this session"
            )));
        }

        let now = now_ms();
        match command {
            Command::PlayPause => {
                self.require_host(caller, "playPause")?;
                self.clock.toggle(now);
                debug!(code = %self.code, playing = self.clock.is_playing, "play/pause");
                Ok(vec![OutgoingMessage::PlaybackChanged {
                    playback: self.clock.clone(),
                }])
            }
            Command::Seek { fraction } => {
                self.require_host(caller, "seek")?;
                if !(0.0..=1.0).contains(&fraction) || !fraction.is_finite() {
                    return Err(CommandError::InvalidArgument(format!(
                        "seek fraction {fraction} outside [0, 1]"
                    )));
                }
                self.clock.seek(fraction, now);
                Ok(vec![OutgoingMessage::PlaybackChanged {
                    playback: self.clock.clone(),
                }])
            }
            Command::SkipNext => {
                self.require_host(caller, "skipNext")?;
                let outcome = self.queue.skip_next();
                Ok(vec![self.after_skip(outcome, now)])
            }
            Command::SkipPrevious => {
                self.require_host(caller, "skipPrevious")?;
                let outcome = self.queue.skip_previous();
                Ok(vec![self.after_skip(outcome, now)])
            }
            Command::AddToQueue { track } => {
                let name = self.display_name(caller);
                let item = QueueItem::new(track, caller.to_string(), name);
                self.queue.push(item);
                Ok(vec![OutgoingMessage::QueueUpdated {
                    queue: self.queue.items(),
                    playback: self.clock.clone(),
                }])
            }
            Command::RemoveFromQueue { index } => {
                if !self.is_host(caller) {
                    let owner = self
                        .queue
                        .get(index)
                        .ok_or_else(|| {
                            CommandError::InvalidArgument(format!("no queue item at index {index}"))
                        })?
                        .added_by_id
                        .clone();
                    if owner != caller {
                        return Err(CommandError::NotAuthorized(
                            "guests may only remove their own queued tracks".into(),
                        ));
                    }
                }
                self.queue.remove(index)?;
                Ok(vec![OutgoingMessage::QueueUpdated {
                    queue: self.queue.items(),
                    playback: self.clock.clone(),
                }])
            }
            Command::SendChat { text } => {
                if text.trim().is_empty() {
                    return Err(CommandError::InvalidArgument(
                        "chat text must not be empty".into(),
                    ));
                }
                if !self.chat_limiter.check(caller, now) {
                    return Err(CommandError::InvalidOperation(
                        "chat rate limit exceeded".into(),
                    ));
                }
                let message =
                    ChatMessage::new(caller.to_string(), self.display_name(caller), text);
                self.chat.push(message.clone());
                Ok(vec![OutgoingMessage::Chat { message }])
            }
            Command::SendReaction { emoji } => {
                if emoji.trim().is_empty() {
                    return Err(CommandError::InvalidArgument(
                        "reaction emoji must not be empty".into(),
                    ));
                }
                let reaction = Reaction::new(caller.to_string(), emoji);
                self.reactions.push(reaction.clone(), now);
                Ok(vec![OutgoingMessage::Reaction { reaction }])
            }
            Command::Leave => Ok(self.leave(caller)),
        }
    }

    /// Explicit departure. Guests are removed; a departing host either
    /// hands off to the longest-joined online guest or ends the session,
    /// per the configured policy.
    pub fn leave(&mut self, id: &str) -> Vec<OutgoingMessage> {
        if self.state == MachineState::Ended || !self.registry.contains(id) {
            return Vec::new();
        }
        self.chat_limiter.forget(id);

        if self.is_host(id) {
            return self.host_departure();
        }

        let mut deltas = Vec::new();
        if let Some(left) = self.registry.remove(id) {
            deltas.push(OutgoingMessage::ParticipantLeft {
                participant_id: left.id.clone(),
            });
            deltas.push(self.push_system_chat(format!("{} left the session", left.display_name)));
            info!(code = %self.code, participant = %left.id, "participant left");
        }
        if self.registry.len() == 1 {
            self.state = MachineState::WaitingForGuest;
        }
        deltas
    }

    fn host_departure(&mut self) -> Vec<OutgoingMessage> {
        let policy = self.host_leave_policy;
        let successor = match policy {
            HostLeavePolicy::Promote => self.registry.next_host(&self.host_id).cloned(),
            HostLeavePolicy::End => None,
        };

        match successor {
            Some(next) => {
                let old_host = self.host_id.clone();
                let mut deltas = Vec::new();
                if let Some(left) = self.registry.remove(&old_host) {
                    deltas.push(OutgoingMessage::ParticipantLeft {
                        participant_id: left.id,
                    });
                }
                self.host_id = next.id.clone();
                self.host_name = next.display_name.clone();
                self.host_avatar = next.avatar_url.clone();
                deltas.push(OutgoingMessage::HostChanged {
                    host_id: next.id.clone(),
                    host_name: next.display_name.clone(),
                });
                deltas.push(
                    self.push_system_chat(format!("{} is now the host", next.display_name)),
                );
                if self.registry.len() == 1 {
                    self.state = MachineState::WaitingForGuest;
                }
                info!(code = %self.code, new_host = %self.host_id, "host handed off");
                deltas
            }
            None => {
                self.state = MachineState::Ended;
                info!(code = %self.code, "session ended, host left");
                vec![OutgoingMessage::SessionEnded {
                    reason: "host left the session".into(),
                }]
            }
        }
    }

    fn after_skip(&mut self, outcome: SkipOutcome, now: u64) -> OutgoingMessage {
        match outcome {
            SkipOutcome::Changed => {
                let current = self.queue.current();
                self.clock
                    .load(current.track_id.clone(), current.duration, now);
            }
            SkipOutcome::Restarted => self.clock.restart(now),
        }
        OutgoingMessage::QueueUpdated {
            queue: self.queue.items(),
            playback: self.clock.clone(),
        }
    }

    fn require_host(&self, caller: &str, op: &str) -> Result<(), CommandError> {
        if self.is_host(caller) {
            Ok(())
        } else {
            Err(CommandError::NotAuthorized(format!(
                "only the host may issue {op}"
            )))
        }
    }

    fn display_name(&self, id: &str) -> String {
        self.registry
            .get(id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn push_system_chat(&mut self, text: String) -> OutgoingMessage {
        let message = ChatMessage::system(text);
        self.chat.push(message.clone());
        OutgoingMessage::Chat { message }
    }
}

/// What `join` reports back to the transport layer.
pub struct JoinOutcome {
    /// True when the id was already in the registry (reconnect).
    pub resumed: bool,
    pub deltas: Vec<OutgoingMessage>,
}
