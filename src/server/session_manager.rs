use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::broadcast::{BroadcastPort, ConnectionId};
use crate::common::errors::CommandError;
use crate::common::types::{ParticipantId, SessionCode, now_ms};
use crate::config::Config;
use crate::playback::{self, MediaPlayback};
use crate::protocol::commands::Command;
use crate::protocol::events::OutgoingMessage;
use crate::protocol::models::{Participant, SessionSnapshot, Track};
use crate::session::{MachineState, SessionMachine};

/// One live session: the machine behind its command lock. Locking the
/// mutex is what totally orders commands for this session; different
/// sessions proceed in parallel.
pub struct SessionHandle {
    machine: Mutex<SessionMachine>,
}

/// What a successful attach hands to the transport: the subscriber's
/// delta stream, already primed with `Ready` and a `Snapshot`, plus the
/// token the transport must present back at detach.
#[derive(Debug)]
pub struct Subscription {
    pub stream: flume::Receiver<OutgoingMessage>,
    pub resumed: bool,
    pub connection: ConnectionId,
}

/// Explicit map from session code to live machine, with create/destroy
/// lifecycle. Owns the broadcast and playback ports.
pub struct SessionManager {
    sessions: DashMap<SessionCode, Arc<SessionHandle>>,
    broadcaster: Arc<dyn BroadcastPort>,
    player: Arc<dyn MediaPlayback>,
    config: Config,
}

impl SessionManager {
    pub fn new(
        config: Config,
        broadcaster: Arc<dyn BroadcastPort>,
        player: Arc<dyn MediaPlayback>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            broadcaster,
            player,
            config,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Create a session with the given host and first track; returns the
    /// invite code. The host is already in the registry; their transport
    /// attaches afterwards like any reconnect.
    pub fn create_session(&self, host: Participant, first_track: Track) -> SessionCode {
        let code = self.vacant_code();
        let machine = SessionMachine::new(
            code.clone(),
            host,
            first_track,
            &self.config.session,
            &self.config.limits,
        );
        self.sessions.insert(
            code.clone(),
            Arc::new(SessionHandle {
                machine: Mutex::new(machine),
            }),
        );
        code
    }

    /// Join (or resume) and subscribe in one step. The join deltas go out
    /// to existing subscribers before the new subscription is registered,
    /// and the snapshot is taken under the same lock, so the snapshot is
    /// causally consistent with the stream that follows it.
    pub async fn attach(
        &self,
        code: &str,
        participant: Participant,
    ) -> Result<Subscription, CommandError> {
        let handle = self.get(code)?;
        let participant_id = participant.id.clone();
        let mut machine = handle.machine.lock().await;

        let outcome = machine.join(participant)?;
        for delta in &outcome.deltas {
            self.broadcaster.publish(code, delta);
        }

        let (stream, connection) = self
            .broadcaster
            .subscribe(&code.to_string(), &participant_id);
        self.broadcaster.send_to(
            code,
            &participant_id,
            &OutgoingMessage::Ready {
                session_code: code.to_string(),
                participant_id: participant_id.clone(),
                resumed: outcome.resumed,
            },
        );
        self.broadcaster.send_to(
            code,
            &participant_id,
            &OutgoingMessage::Snapshot {
                session: machine.snapshot(now_ms()),
            },
        );

        Ok(Subscription {
            stream,
            resumed: outcome.resumed,
            connection,
        })
    }

    /// Apply one command for `caller`. Validation errors come back to the
    /// caller only; committed deltas fan out to everyone.
    pub async fn handle_command(
        &self,
        code: &str,
        caller: &ParticipantId,
        command: Command,
    ) -> Result<(), CommandError> {
        let handle = self.get(code)?;
        let mut machine = handle.machine.lock().await;

        // Publish stays under the lock so fan-out order is commit order.
        let deltas = machine.apply(caller, command)?;
        for delta in &deltas {
            self.broadcaster.publish(code, delta);
        }
        let ended = machine.state() == MachineState::Ended;
        drop(machine);

        // Effects run off the lock; a slow player must not stall the
        // session's command stream.
        playback::apply_effects(self.player.as_ref(), &deltas).await;

        if ended {
            self.destroy(code);
        }
        Ok(())
    }

    /// Transport dropped without an explicit leave: mark offline, keep
    /// the seat. A later attach with the same id resumes it. When the
    /// participant has already re-attached on a newer connection, the
    /// token mismatch makes this a no-op so the live connection keeps
    /// its stream and its presence.
    pub async fn detach(&self, code: &str, participant_id: &str, connection: ConnectionId) {
        if !self.broadcaster.unsubscribe(code, participant_id, connection) {
            return;
        }
        let Ok(handle) = self.get(code) else {
            return;
        };
        let mut machine = handle.machine.lock().await;
        for delta in machine.mark_offline(participant_id) {
            self.broadcaster.publish(code, &delta);
        }
    }

    /// Read-only snapshot, for the REST surface.
    pub async fn snapshot(&self, code: &str) -> Result<SessionSnapshot, CommandError> {
        let handle = self.get(code)?;
        let machine = handle.machine.lock().await;
        Ok(machine.snapshot(now_ms()))
    }

    /// End and remove sessions past their expiry. Run periodically.
    pub async fn sweep_expired(&self) {
        let now = now_ms();
        let codes: Vec<SessionCode> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for code in codes {
            let Some(handle) = self.sessions.get(&code).map(|e| e.value().clone()) else {
                continue;
            };
            let machine = handle.machine.lock().await;
            if machine.is_expired(now) {
                warn!(code = %code, "session expired");
                self.broadcaster.publish(
                    &code,
                    &OutgoingMessage::SessionEnded {
                        reason: "session expired".into(),
                    },
                );
                drop(machine);
                self.destroy(&code);
            }
        }
    }

    fn destroy(&self, code: &str) {
        info!(code = %code, "destroying session");
        self.sessions.remove(code);
        self.broadcaster.drop_session(code);
    }

    fn get(&self, code: &str) -> Result<Arc<SessionHandle>, CommandError> {
        self.sessions
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CommandError::NotFound(format!("no session with code {code}")))
    }

    /// 6 random digits, retried until unique among live sessions.
    fn vacant_code(&self) -> SessionCode {
        let mut rng = rand::thread_rng();
        loop {
            let code = rng.gen_range(100_000..1_000_000).to_string();
            if !self.sessions.contains_key(&code) {
                return code;
            }
        }
    }
}
