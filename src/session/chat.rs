use std::collections::{HashMap, VecDeque};

use crate::common::types::ParticipantId;
use crate::protocol::models::{ChatMessage, Reaction};

/// Bounded append-only chat log. Long-lived sessions must not grow
/// without bound, so only the newest `capacity` messages are retained.
#[derive(Debug, Clone)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }
}

/// Sliding-window rate limiter, one window per participant.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    burst: usize,
    window_ms: u64,
    sent: HashMap<ParticipantId, VecDeque<u64>>,
}

impl RateLimiter {
    pub fn new(burst: usize, window_ms: u64) -> Self {
        Self {
            burst,
            window_ms,
            sent: HashMap::new(),
        }
    }

    /// Record an attempt at `now_ms`; false when over the limit.
    pub fn check(&mut self, id: &str, now_ms: u64) -> bool {
        let window = self.sent.entry(id.to_string()).or_default();
        while let Some(&oldest) = window.front() {
            if now_ms.saturating_sub(oldest) >= self.window_ms {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() >= self.burst {
            return false;
        }
        window.push_back(now_ms);
        true
    }

    pub fn forget(&mut self, id: &str) {
        self.sent.remove(id);
    }
}

/// Time-windowed reaction set. Expiry is presentation-driven: a reaction
/// only exists for the display window, then is pruned.
#[derive(Debug, Clone)]
pub struct ReactionWindow {
    reactions: VecDeque<Reaction>,
    window_ms: u64,
    capacity: usize,
}

impl ReactionWindow {
    pub fn new(window_ms: u64, capacity: usize) -> Self {
        Self {
            reactions: VecDeque::with_capacity(capacity),
            window_ms,
            capacity,
        }
    }

    pub fn push(&mut self, reaction: Reaction, now_ms: u64) {
        self.prune(now_ms);
        if self.reactions.len() >= self.capacity {
            self.reactions.pop_front();
        }
        self.reactions.push_back(reaction);
    }

    pub fn prune(&mut self, now_ms: u64) {
        while let Some(front) = self.reactions.front() {
            if now_ms.saturating_sub(front.sent_at) >= self.window_ms {
                self.reactions.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn active(&self, now_ms: u64) -> Vec<Reaction> {
        self.reactions
            .iter()
            .filter(|r| now_ms.saturating_sub(r.sent_at) < self.window_ms)
            .cloned()
            .collect()
    }
}
