use async_trait::async_trait;

use crate::common::types::TrackId;
use crate::protocol::events::OutgoingMessage;

/// Media-playback port. The engine calls these as side effects of
/// committed state changes; how audio is decoded or streamed is the
/// collaborator's business.
#[async_trait]
pub trait MediaPlayback: Send + Sync {
    async fn play(&self);
    async fn pause(&self);
    async fn seek_to(&self, fraction: f64);
    async fn load_track(&self, track_id: &TrackId);
}

/// Drives the playback port from a committed delta stream.
pub async fn apply_effects(player: &dyn MediaPlayback, deltas: &[OutgoingMessage]) {
    for delta in deltas {
        match delta {
            OutgoingMessage::PlaybackChanged { playback } => {
                player.seek_to(playback.progress_fraction).await;
                if playback.is_playing {
                    player.play().await;
                } else {
                    player.pause().await;
                }
            }
            OutgoingMessage::QueueUpdated { playback, .. } => {
                if let Some(track_id) = &playback.current_track_id {
                    player.load_track(track_id).await;
                    player.seek_to(playback.progress_fraction).await;
                    if playback.is_playing {
                        player.play().await;
                    }
                }
            }
            _ => {}
        }
    }
}

/// Headless implementation for tests and server deployments where the
/// actual audio lives on the clients.
#[derive(Debug, Default)]
pub struct NoopPlayback;

#[async_trait]
impl MediaPlayback for NoopPlayback {
    async fn play(&self) {}
    async fn pause(&self) {}
    async fn seek_to(&self, _fraction: f64) {}
    async fn load_track(&self, _track_id: &TrackId) {}
}
