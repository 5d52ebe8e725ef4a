use dashmap::DashMap;
use uuid::Uuid;

use crate::common::types::{ParticipantId, SessionCode};
use crate::protocol::events::OutgoingMessage;

/// Identifies one physical connection. A participant who reconnects gets
/// a new token; the old connection's teardown must not touch the new one.
pub type ConnectionId = Uuid;

/// Fan-out boundary between the session engine and concrete transports.
/// Callers must hold the session's command lock across snapshot-taking
/// and `subscribe` so the snapshot stays causally consistent with the
/// delta stream that follows it; the port itself only routes.
pub trait BroadcastPort: Send + Sync {
    /// Register a subscriber and hand back its delta stream plus the
    /// token that names this particular connection. Subscribing an
    /// already-present participant replaces their previous stream.
    fn subscribe(
        &self,
        code: &SessionCode,
        participant: &ParticipantId,
    ) -> (flume::Receiver<OutgoingMessage>, ConnectionId);

    /// Remove the participant's subscription, but only if it still
    /// belongs to `connection`. Returns whether anything was removed, so
    /// a stale connection's teardown can tell it lost the seat.
    fn unsubscribe(&self, code: &str, participant: &str, connection: ConnectionId) -> bool;

    /// Fan a committed delta out to every subscriber, in commit order.
    fn publish(&self, code: &str, delta: &OutgoingMessage);

    /// Deliver a framing message (ready, snapshot, error) to one
    /// subscriber only.
    fn send_to(&self, code: &str, participant: &str, message: &OutgoingMessage);

    /// Tear down all subscriptions for a destroyed session.
    fn drop_session(&self, code: &str);
}

type SubscriberMap = DashMap<ParticipantId, (ConnectionId, flume::Sender<OutgoingMessage>)>;

/// In-process implementation: one unbounded flume channel per subscriber.
/// The WebSocket layer drains the receiver into the socket; a dropped
/// receiver just makes sends fail silently until unsubscribe.
#[derive(Default)]
pub struct FlumeBroadcaster {
    sessions: DashMap<SessionCode, SubscriberMap>,
}

impl FlumeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadcastPort for FlumeBroadcaster {
    fn subscribe(
        &self,
        code: &SessionCode,
        participant: &ParticipantId,
    ) -> (flume::Receiver<OutgoingMessage>, ConnectionId) {
        let (tx, rx) = flume::unbounded();
        let connection = Uuid::new_v4();
        self.sessions
            .entry(code.clone())
            .or_default()
            .insert(participant.clone(), (connection, tx));
        (rx, connection)
    }

    fn unsubscribe(&self, code: &str, participant: &str, connection: ConnectionId) -> bool {
        if let Some(subscribers) = self.sessions.get(code) {
            return subscribers
                .remove_if(participant, |_, (current, _)| *current == connection)
                .is_some();
        }
        false
    }

    fn publish(&self, code: &str, delta: &OutgoingMessage) {
        if let Some(subscribers) = self.sessions.get(code) {
            for entry in subscribers.iter() {
                let _ = entry.value().1.send(delta.clone());
            }
        }
    }

    fn send_to(&self, code: &str, participant: &str, message: &OutgoingMessage) {
        if let Some(subscribers) = self.sessions.get(code) {
            if let Some(entry) = subscribers.get(participant) {
                let _ = entry.value().1.send(message.clone());
            }
        }
    }

    fn drop_session(&self, code: &str) {
        self.sessions.remove(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence(id: &str, online: bool) -> OutgoingMessage {
        OutgoingMessage::PresenceChanged {
            participant_id: id.into(),
            is_online: online,
        }
    }

    #[test]
    fn publish_reaches_all_subscribers_in_order() {
        let port = FlumeBroadcaster::new();
        let code: SessionCode = "123456".into();
        let (rx_a, _) = port.subscribe(&code, &"a".to_string());
        let (rx_b, _) = port.subscribe(&code, &"b".to_string());

        port.publish(&code, &presence("x", false));
        port.publish(&code, &presence("x", true));

        for rx in [&rx_a, &rx_b] {
            assert_eq!(rx.recv().unwrap(), presence("x", false));
            assert_eq!(rx.recv().unwrap(), presence("x", true));
        }
    }

    #[test]
    fn send_to_targets_one_subscriber() {
        let port = FlumeBroadcaster::new();
        let code: SessionCode = "123456".into();
        let (rx_a, _) = port.subscribe(&code, &"a".to_string());
        let (rx_b, _) = port.subscribe(&code, &"b".to_string());

        port.send_to(&code, "a", &presence("a", true));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let port = FlumeBroadcaster::new();
        let code: SessionCode = "123456".into();
        let (rx, connection) = port.subscribe(&code, &"a".to_string());
        assert!(port.unsubscribe(&code, "a", connection));
        port.publish(&code, &presence("x", true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stale_unsubscribe_leaves_the_fresh_subscription_alone() {
        let port = FlumeBroadcaster::new();
        let code: SessionCode = "123456".into();
        let (rx_old, old_connection) = port.subscribe(&code, &"a".to_string());
        let (rx_new, _) = port.subscribe(&code, &"a".to_string());

        // The replaced sender is gone, so the old stream is dead.
        assert!(rx_old.is_disconnected());

        // The old connection's teardown must not evict the new one.
        assert!(!port.unsubscribe(&code, "a", old_connection));
        port.publish(&code, &presence("x", true));
        assert_eq!(rx_new.recv().unwrap(), presence("x", true));
    }
}
