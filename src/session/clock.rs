use serde::{Deserialize, Serialize};

use crate::common::types::TrackId;

/// Authoritative position on the shared timeline. Clients never poll for
/// progress: they extrapolate from `(progress_fraction, last_update)` and
/// rebase whenever a broadcast refreshes the anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackClock {
    #[serde(default)]
    pub current_track_id: Option<TrackId>,
    pub is_playing: bool,
    /// Position as a fraction of track duration, within [0, 1].
    pub progress_fraction: f64,
    /// Duration of the current track in milliseconds. Zero when nothing
    /// is loaded; extrapolation then holds still.
    pub duration_ms: u64,
    /// Server clock at the moment the anchor was committed.
    pub last_update_ms: u64,
}

impl PlaybackClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            current_track_id: None,
            is_playing: false,
            progress_fraction: 0.0,
            duration_ms: 0,
            last_update_ms: now_ms,
        }
    }

    /// Pure extrapolation: where the timeline is at `now_ms` given the
    /// last committed anchor. Clamped to 1.0 at track end.
    pub fn extrapolate(&self, now_ms: u64) -> f64 {
        if !self.is_playing || self.duration_ms == 0 {
            return self.progress_fraction;
        }
        let elapsed = now_ms.saturating_sub(self.last_update_ms) as f64;
        let advanced = self.progress_fraction + elapsed / self.duration_ms as f64;
        advanced.clamp(0.0, 1.0)
    }

    /// Toggle play/pause. The current extrapolated position is committed
    /// as the new anchor so a pause freezes the bar exactly where every
    /// client sees it.
    pub fn toggle(&mut self, now_ms: u64) {
        self.progress_fraction = self.extrapolate(now_ms);
        self.is_playing = !self.is_playing;
        self.last_update_ms = now_ms;
    }

    /// Seek to an absolute fraction. Caller validates the range.
    pub fn seek(&mut self, fraction: f64, now_ms: u64) {
        self.progress_fraction = fraction;
        self.last_update_ms = now_ms;
    }

    /// Load a new track at position zero, keeping the play/pause flag.
    pub fn load(&mut self, track_id: TrackId, duration_ms: u64, now_ms: u64) {
        self.current_track_id = Some(track_id);
        self.duration_ms = duration_ms;
        self.progress_fraction = 0.0;
        self.last_update_ms = now_ms;
    }

    /// Restart the current track from zero.
    pub fn restart(&mut self, now_ms: u64) {
        self.progress_fraction = 0.0;
        self.last_update_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(progress: f64, anchor: u64, playing: bool) -> PlaybackClock {
        PlaybackClock {
            current_track_id: Some("t1".into()),
            is_playing: playing,
            progress_fraction: progress,
            duration_ms: 100_000,
            last_update_ms: anchor,
        }
    }

    #[test]
    fn extrapolates_while_playing() {
        let clock = clock_at(0.2, 1_000, true);
        // 30s into a 100s track after 10s of wall time.
        assert!((clock.extrapolate(11_000) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn holds_still_while_paused() {
        let clock = clock_at(0.4, 1_000, false);
        assert_eq!(clock.extrapolate(500_000), 0.4);
    }

    #[test]
    fn clamps_at_track_end() {
        let clock = clock_at(0.9, 1_000, true);
        assert_eq!(clock.extrapolate(1_000_000), 1.0);
    }

    #[test]
    fn toggle_commits_extrapolated_position() {
        let mut clock = clock_at(0.0, 0, true);
        clock.toggle(50_000); // pause halfway
        assert!(!clock.is_playing);
        assert!((clock.progress_fraction - 0.5).abs() < 1e-9);
        assert_eq!(clock.last_update_ms, 50_000);
        // Paused clock does not drift.
        assert!((clock.extrapolate(90_000) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn seek_refreshes_anchor() {
        let mut clock = clock_at(0.1, 0, true);
        clock.seek(0.75, 20_000);
        assert_eq!(clock.progress_fraction, 0.75);
        assert_eq!(clock.last_update_ms, 20_000);
    }

    #[test]
    fn empty_clock_never_advances() {
        let clock = PlaybackClock::new(0);
        assert_eq!(clock.extrapolate(1_000_000), 0.0);
    }
}
