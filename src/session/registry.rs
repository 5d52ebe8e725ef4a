use crate::protocol::models::Participant;

/// Presence set for one session, ordered by join time so host promotion
/// is deterministic. Records are only removed by an explicit leave; a
/// transport drop merely flips `is_online`.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Join-ordered list, the shape every snapshot carries.
    pub fn list(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    /// Insert preserving join order. Re-adding an existing id is a no-op
    /// (idempotent reconnect) and reports false.
    pub fn add(&mut self, participant: Participant) -> bool {
        if self.contains(&participant.id) {
            return false;
        }
        let pos = self
            .participants
            .iter()
            .position(|p| p.joined_at > participant.joined_at)
            .unwrap_or(self.participants.len());
        self.participants.insert(pos, participant);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(pos))
    }

    /// Returns true if the flag actually changed, so callers can suppress
    /// duplicate presence deltas.
    pub fn mark_online(&mut self, id: &str) -> bool {
        self.set_online(id, true)
    }

    pub fn mark_offline(&mut self, id: &str) -> bool {
        self.set_online(id, false)
    }

    fn set_online(&mut self, id: &str, online: bool) -> bool {
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(p) if p.is_online != online => {
                p.is_online = online;
                true
            }
            _ => false,
        }
    }

    /// Longest-joined online participant other than `excluding`; the
    /// promotion candidate when the host leaves.
    pub fn next_host(&self, excluding: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id != excluding && p.is_online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, joined_at: u64) -> Participant {
        Participant {
            id: id.into(),
            display_name: id.to_uppercase(),
            avatar_url: None,
            joined_at,
            is_online: true,
        }
    }

    #[test]
    fn add_keeps_join_order() {
        let mut reg = ParticipantRegistry::new();
        reg.add(participant("b", 200));
        reg.add(participant("a", 100));
        reg.add(participant("c", 300));
        let ids: Vec<_> = reg.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn re_add_is_idempotent() {
        let mut reg = ParticipantRegistry::new();
        assert!(reg.add(participant("a", 100)));
        assert!(!reg.add(participant("a", 500)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn presence_marks_are_idempotent() {
        let mut reg = ParticipantRegistry::new();
        reg.add(participant("a", 100));
        assert!(reg.mark_offline("a"));
        assert!(!reg.mark_offline("a"));
        assert!(reg.mark_online("a"));
        assert!(!reg.mark_online("a"));
        assert!(!reg.mark_online("ghost"));
    }

    #[test]
    fn next_host_prefers_longest_joined_online() {
        let mut reg = ParticipantRegistry::new();
        reg.add(participant("host", 100));
        reg.add(participant("g1", 200));
        reg.add(participant("g2", 300));
        reg.mark_offline("g1");
        assert_eq!(reg.next_host("host").unwrap().id, "g2");
        reg.mark_online("g1");
        assert_eq!(reg.next_host("host").unwrap().id, "g1");
    }
}
