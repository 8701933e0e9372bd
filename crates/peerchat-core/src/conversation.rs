//! Conversation Store
//!
//! Maps each peer identity to its conversation state: one owned
//! [`MessageHistoryBuffer`] plus the unread counter and a cached status label.
//! Every successful mutation yields a [`ConversationChange`] for fan-out to
//! the presentation layer.

use crate::history::{MessageHistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::message::Message;
use crate::peer::PeerStatus;
use crate::types::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ----------------------------------------------------------------------------
// Change Notifications
// ----------------------------------------------------------------------------

/// Kind of conversation mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationChangeKind {
    Created,
    MessageAppended,
    UnreadReset,
    PeerStatusChanged,
    Cleared,
    Removed,
}

/// A conversation mutation, keyed by peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationChange {
    pub peer_id: PeerId,
    pub kind: ConversationChangeKind,
}

impl ConversationChange {
    pub fn new(peer_id: PeerId, kind: ConversationChangeKind) -> Self {
        Self { peer_id, kind }
    }
}

// ----------------------------------------------------------------------------
// Conversation
// ----------------------------------------------------------------------------

/// Message history and unread state for one peer
#[derive(Debug, Clone)]
pub struct Conversation {
    peer_id: PeerId,
    peer_name: String,
    peer_status: PeerStatus,
    messages: MessageHistoryBuffer,
    unread_count: usize,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(peer_id: PeerId, peer_name: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            peer_id,
            peer_name: peer_name.into(),
            peer_status: PeerStatus::Discovered,
            messages: MessageHistoryBuffer::with_capacity(history_capacity),
            unread_count: 0,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    /// Cached status label (UI-facing, not authoritative)
    pub fn peer_status(&self) -> PeerStatus {
        self.peer_status
    }

    pub fn messages(&self) -> &MessageHistoryBuffer {
        &self.messages
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message; inbound messages bump the unread counter
    pub fn push(&mut self, message: Message) {
        if !message.is_from_me() {
            self.unread_count += 1;
        }
        self.messages.append(message);
    }

    pub fn mark_read(&mut self) {
        self.unread_count = 0;
    }

    /// Drop all history and reset the unread counter
    pub fn clear(&mut self) {
        self.messages.clear();
        self.unread_count = 0;
    }

    /// Preview of the last message, or a placeholder when empty
    pub fn preview(&self) -> String {
        self.last_message()
            .map(Message::preview)
            .unwrap_or_else(|| "No messages".to_string())
    }

    /// Tab/list header, e.g. `"Alice (3)"` when there are unread messages
    pub fn tab_header(&self) -> String {
        if self.has_unread() {
            format!("{} ({})", self.peer_name, self.unread_count)
        } else {
            self.peer_name.clone()
        }
    }

    /// Owned summary for list rendering
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            peer_id: self.peer_id.clone(),
            peer_name: self.peer_name.clone(),
            peer_status: self.peer_status,
            unread_count: self.unread_count,
            message_count: self.messages.len(),
            last_message: self.last_message().cloned(),
            preview: self.preview(),
        }
    }

    /// Owned full view including the message list
    pub fn view(&self) -> ConversationView {
        ConversationView {
            summary: self.summary(),
            messages: self.messages.to_vec(),
        }
    }
}

/// Read model for conversation lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub peer_id: PeerId,
    pub peer_name: String,
    pub peer_status: PeerStatus,
    pub unread_count: usize,
    pub message_count: usize,
    pub last_message: Option<Message>,
    pub preview: String,
}

/// Read model for an open conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationView {
    pub summary: ConversationSummary,
    pub messages: Vec<Message>,
}

// ----------------------------------------------------------------------------
// Conversation Store
// ----------------------------------------------------------------------------

/// Owns every conversation, one per peer, in creation order
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: HashMap<PeerId, Conversation>,
    order: Vec<PeerId>,
    history_capacity: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConversationStore {
    /// Create an empty store whose conversations keep `history_capacity` messages
    pub fn new(history_capacity: usize) -> Self {
        Self {
            conversations: HashMap::new(),
            order: Vec::new(),
            history_capacity,
        }
    }

    /// Return the existing conversation or create an empty one
    ///
    /// The boolean is `true` when the conversation was created by this call.
    pub fn get_or_create(
        &mut self,
        peer_id: &PeerId,
        peer_name: &str,
    ) -> (&mut Conversation, bool) {
        let created = !self.conversations.contains_key(peer_id);
        if created {
            self.order.push(peer_id.clone());
        }
        let capacity = self.history_capacity;
        let conversation = self
            .conversations
            .entry(peer_id.clone())
            .or_insert_with(|| Conversation::new(peer_id.clone(), peer_name, capacity));
        (conversation, created)
    }

    /// Append a message to an existing conversation
    ///
    /// Returns `None` if there is no conversation for `peer_id`.
    pub fn append_message(
        &mut self,
        peer_id: &PeerId,
        message: Message,
    ) -> Option<ConversationChange> {
        let conversation = self.conversations.get_mut(peer_id)?;
        conversation.push(message);
        Some(ConversationChange::new(
            peer_id.clone(),
            ConversationChangeKind::MessageAppended,
        ))
    }

    /// Reset the unread counter; no-op if the conversation is absent
    pub fn mark_read(&mut self, peer_id: &PeerId) -> Option<ConversationChange> {
        let conversation = self.conversations.get_mut(peer_id)?;
        conversation.mark_read();
        Some(ConversationChange::new(
            peer_id.clone(),
            ConversationChangeKind::UnreadReset,
        ))
    }

    /// Drop the history of a conversation but keep the conversation itself
    pub fn clear(&mut self, peer_id: &PeerId) -> Option<ConversationChange> {
        let conversation = self.conversations.get_mut(peer_id)?;
        conversation.clear();
        Some(ConversationChange::new(
            peer_id.clone(),
            ConversationChangeKind::Cleared,
        ))
    }

    /// Discard a conversation and its history
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<ConversationChange> {
        self.conversations.remove(peer_id)?;
        self.order.retain(|id| id != peer_id);
        Some(ConversationChange::new(
            peer_id.clone(),
            ConversationChangeKind::Removed,
        ))
    }

    /// Update the cached status label only when it actually changes
    pub fn update_peer_status(
        &mut self,
        peer_id: &PeerId,
        connected: bool,
    ) -> Option<ConversationChange> {
        let conversation = self.conversations.get_mut(peer_id)?;
        let status = if connected {
            PeerStatus::Connected
        } else {
            PeerStatus::Discovered
        };
        if conversation.peer_status == status {
            return None;
        }
        conversation.peer_status = status;
        Some(ConversationChange::new(
            peer_id.clone(),
            ConversationChangeKind::PeerStatusChanged,
        ))
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&Conversation> {
        self.conversations.get(peer_id)
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.conversations.contains_key(peer_id)
    }

    /// First conversation in creation order
    pub fn first_id(&self) -> Option<&PeerId> {
        self.order.first()
    }

    /// Owned summaries in creation order
    pub fn all(&self) -> Vec<ConversationSummary> {
        self.order
            .iter()
            .filter_map(|id| self.conversations.get(id))
            .map(Conversation::summary)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn total_unread(&self) -> usize {
        self.conversations.values().map(Conversation::unread_count).sum()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::types::Timestamp;

    fn inbound(text: &str) -> Message {
        Message::inbound("Alice", text, Timestamp::new(0), MessageKind::Text)
    }

    fn outbound(text: &str) -> Message {
        Message::outbound("Me", text, Timestamp::new(0), MessageKind::Text)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = ConversationStore::default();
        let alice = PeerId::new("alice");

        let (_, created) = store.get_or_create(&alice, "Alice");
        assert!(created);
        let (conversation, created) = store.get_or_create(&alice, "Someone Else");
        assert!(!created);
        assert_eq!(conversation.peer_name(), "Alice");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unread_counts_only_inbound() {
        let mut store = ConversationStore::default();
        let alice = PeerId::new("alice");
        store.get_or_create(&alice, "Alice");

        store.append_message(&alice, inbound("1"));
        store.append_message(&alice, outbound("2"));
        store.append_message(&alice, inbound("3"));

        let conversation = store.get(&alice).expect("conversation exists");
        assert_eq!(conversation.unread_count(), 2);
        assert_eq!(conversation.tab_header(), "Alice (2)");

        let change = store.mark_read(&alice);
        assert_eq!(change.map(|c| c.kind), Some(ConversationChangeKind::UnreadReset));
        assert_eq!(store.get(&alice).map(Conversation::unread_count), Some(0));
    }

    #[test]
    fn test_mutations_on_missing_conversation_are_noops() {
        let mut store = ConversationStore::default();
        let ghost = PeerId::new("ghost");

        assert!(store.append_message(&ghost, inbound("x")).is_none());
        assert!(store.mark_read(&ghost).is_none());
        assert!(store.remove(&ghost).is_none());
        assert!(store.update_peer_status(&ghost, true).is_none());
    }

    #[test]
    fn test_remove_updates_order() {
        let mut store = ConversationStore::default();
        for id in ["a", "b", "c"] {
            store.get_or_create(&PeerId::new(id), id);
        }

        store.remove(&PeerId::new("a"));
        assert_eq!(store.first_id(), Some(&PeerId::new("b")));
        let ids: Vec<PeerId> = store.all().into_iter().map(|s| s.peer_id).collect();
        assert_eq!(ids, vec![PeerId::new("b"), PeerId::new("c")]);
    }

    #[test]
    fn test_update_peer_status_reports_only_real_changes() {
        let mut store = ConversationStore::default();
        let alice = PeerId::new("alice");
        store.get_or_create(&alice, "Alice");

        assert!(store.update_peer_status(&alice, false).is_none());
        assert!(store.update_peer_status(&alice, true).is_some());
        assert_eq!(
            store.get(&alice).map(Conversation::peer_status),
            Some(PeerStatus::Connected)
        );
    }

    #[test]
    fn test_summary_preview_and_clear() {
        let mut conversation = Conversation::new(PeerId::new("alice"), "Alice", 10);
        assert_eq!(conversation.preview(), "No messages");

        conversation.push(inbound("hello"));
        let summary = conversation.summary();
        assert_eq!(summary.preview, "hello");
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.unread_count, 1);

        conversation.clear();
        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.unread_count(), 0);
    }
}
