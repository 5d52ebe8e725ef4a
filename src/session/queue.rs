use std::collections::VecDeque;

use crate::common::errors::CommandError;
use crate::protocol::models::QueueItem;

/// Skips replayed from history are bounded; this is not an infinite undo.
const HISTORY_LIMIT: usize = 32;

/// Outcome of a skip. "No next track" and "no previous track" are defined
/// fallbacks, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The queue advanced (or rewound) to a different track.
    Changed,
    /// The current track restarts from zero.
    Restarted,
}

/// Ordered playback queue. Index 0 is always the now-playing track, so
/// the queue is never empty: skipping the last item restarts it instead
/// of draining the queue.
#[derive(Debug, Clone)]
pub struct JamQueue {
    items: VecDeque<QueueItem>,
    history: Vec<QueueItem>,
}

impl JamQueue {
    pub fn new(first: QueueItem) -> Self {
        let mut items = VecDeque::new();
        items.push_back(first);
        Self {
            items,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &QueueItem {
        &self.items[0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> Vec<QueueItem> {
        self.items.iter().cloned().collect()
    }

    pub fn get(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    pub fn push(&mut self, item: QueueItem) {
        self.items.push_back(item);
    }

    /// Remove a pending item. Index 0 is the now-playing track and must
    /// be skipped, not removed.
    pub fn remove(&mut self, index: usize) -> Result<QueueItem, CommandError> {
        if index == 0 {
            return Err(CommandError::InvalidOperation(
                "cannot remove the now-playing track, use skipNext".into(),
            ));
        }
        self.items
            .remove(index)
            .ok_or_else(|| CommandError::InvalidArgument(format!("no queue item at index {index}")))
    }

    /// Advance the queue. The finished track goes to bounded history so
    /// skip-previous can replay it. Attribution travels with the item.
    pub fn skip_next(&mut self) -> SkipOutcome {
        if self.items.len() == 1 {
            return SkipOutcome::Restarted;
        }
        let finished = self.items.pop_front().expect("index 0 always occupied");
        if self.history.len() >= HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(finished);
        SkipOutcome::Changed
    }

    /// Rewind to the previously played track, or restart the current one
    /// when history is empty.
    pub fn skip_previous(&mut self) -> SkipOutcome {
        match self.history.pop() {
            Some(previous) => {
                self.items.push_front(previous);
                SkipOutcome::Changed
            }
            None => SkipOutcome::Restarted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::models::Track;

    fn item(track_id: &str, added_by: &str) -> QueueItem {
        QueueItem::new(
            Track {
                id: track_id.into(),
                title: format!("Title {track_id}"),
                artist: "Artist".into(),
                artwork: None,
                duration: 200_000,
            },
            added_by.into(),
            added_by.to_uppercase(),
        )
    }

    #[test]
    fn skip_next_promotes_and_records_history() {
        let mut queue = JamQueue::new(item("a", "host"));
        queue.push(item("b", "guest"));

        assert_eq!(queue.skip_next(), SkipOutcome::Changed);
        assert_eq!(queue.current().track_id, "b");
        // Attribution survives the skip.
        assert_eq!(queue.current().added_by_id, "guest");

        assert_eq!(queue.skip_previous(), SkipOutcome::Changed);
        assert_eq!(queue.current().track_id, "a");
    }

    #[test]
    fn skip_next_on_singleton_restarts() {
        let mut queue = JamQueue::new(item("a", "host"));
        assert_eq!(queue.skip_next(), SkipOutcome::Restarted);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.current().track_id, "a");
    }

    #[test]
    fn skip_previous_without_history_restarts() {
        let mut queue = JamQueue::new(item("a", "host"));
        assert_eq!(queue.skip_previous(), SkipOutcome::Restarted);
        assert_eq!(queue.current().track_id, "a");
    }

    #[test]
    fn remove_rejects_now_playing() {
        let mut queue = JamQueue::new(item("a", "host"));
        queue.push(item("b", "guest"));
        assert!(matches!(
            queue.remove(0),
            Err(CommandError::InvalidOperation(_))
        ));
        assert!(matches!(
            queue.remove(5),
            Err(CommandError::InvalidArgument(_))
        ));
        let removed = queue.remove(1).unwrap();
        assert_eq!(removed.track_id, "b");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut queue = JamQueue::new(item("seed", "host"));
        for i in 0..(HISTORY_LIMIT + 10) {
            queue.push(item(&format!("t{i}"), "host"));
            queue.skip_next();
        }
        assert!(queue.history.len() <= HISTORY_LIMIT);
    }
}
