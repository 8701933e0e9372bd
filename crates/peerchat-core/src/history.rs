//! Bounded per-conversation message history
//!
//! [`MessageHistoryBuffer`] keeps the most recent messages of one
//! conversation in insertion order. Eviction is purely count based: when the
//! buffer is full the oldest message is dropped before the new one is stored.

use crate::message::Message;
use std::collections::VecDeque;

/// Default number of messages retained per conversation
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Bounded FIFO of messages, oldest first
#[derive(Debug, Clone)]
pub struct MessageHistoryBuffer {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Default for MessageHistoryBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MessageHistoryBuffer {
    /// Create a buffer with the default capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding at most `capacity` messages (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append a message, evicting the oldest one if the buffer is full
    ///
    /// Returns the evicted message, if any.
    pub fn append(&mut self, message: Message) -> Option<Message> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// Owned snapshot in insertion order
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every message
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
