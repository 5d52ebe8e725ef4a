/// Short human-shareable invite code (6 digits).
pub type SessionCode = String;
/// Stable participant identity, pre-established by the caller.
pub type ParticipantId = String;
pub type TrackId = String;

/// Sender id used for machine-generated chat lines ("X joined").
pub const SYSTEM_SENDER: &str = "system";

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
