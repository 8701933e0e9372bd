//! Session State
//!
//! [`SessionState`] is the single owner of the peer registry, the conversation
//! store, the current selection and the status line. It is synchronous: the
//! caller supplies `now` and decides when transport calls happen. Every
//! mutating operation returns the [`StateChange`]s it produced, in order, so
//! the owning task can broadcast them after the mutation is complete.
//!
//! Command guards (`check_*`) are pure reads. The session task evaluates them
//! immediately before the transport call and applies the matching `record_*`
//! only after the call succeeded, so a rejected or failed command never
//! changes local state.

use crate::channel::{Event, PeerListChangeKind, SessionStatus, StateChange};
use crate::config::SessionConfig;
use crate::conversation::{
    ConversationChange, ConversationChangeKind, ConversationStore, ConversationSummary,
    ConversationView,
};
use crate::errors::{CommandError, TransportError};
use crate::message::{Message, MessageKind};
use crate::peer::Peer;
use crate::registry::{PeerChange, PeerRegistry};
use crate::types::{PeerId, Timestamp};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

// ----------------------------------------------------------------------------
// Statistics and Snapshots
// ----------------------------------------------------------------------------

/// Counters for the lifetime of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub events_applied: u64,
    pub messages_received: u64,
    pub files_received: u64,
    pub messages_sent: u64,
    pub files_sent: u64,
    pub peers_swept: u64,
    pub transport_failures: u64,
}

/// Owned, point-in-time copy of the observable session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub local_name: String,
    /// Known peers in discovery order
    pub peers: Vec<Peer>,
    /// Conversations in creation order
    pub conversations: Vec<ConversationSummary>,
    pub selected: Option<PeerId>,
    pub status: SessionStatus,
    pub is_discovering: bool,
    pub stats: SessionStats,
    /// When the snapshot was taken, for rendering last-seen ages
    pub taken_at: Timestamp,
}

impl SessionSnapshot {
    pub fn peer(&self, peer_id: &PeerId) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.id == peer_id)
    }

    pub fn conversation(&self, peer_id: &PeerId) -> Option<&ConversationSummary> {
        self.conversations.iter().find(|c| &c.peer_id == peer_id)
    }

    pub fn connected_count(&self) -> usize {
        self.peers.iter().filter(|p| p.is_connected()).count()
    }

    pub fn total_unread(&self) -> usize {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }
}

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// Complete mutable state of a chat session
#[derive(Debug, Clone)]
pub struct SessionState {
    registry: PeerRegistry,
    conversations: ConversationStore,
    selected: Option<PeerId>,
    status: SessionStatus,
    is_discovering: bool,
    first_connection_seen: bool,
    stats: SessionStats,
}

impl SessionState {
    /// Create an empty session for the configured local user
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            registry: PeerRegistry::new(config.local_name.clone()),
            conversations: ConversationStore::new(config.history_capacity),
            selected: None,
            status: SessionStatus::Disconnected,
            is_discovering: false,
            first_connection_seen: false,
            stats: SessionStats::default(),
        }
    }

    pub fn local_name(&self) -> &str {
        self.registry.local_name()
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn selected(&self) -> Option<&PeerId> {
        self.selected.as_ref()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_discovering(&self) -> bool {
        self.is_discovering
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Display name for a peer: registry name, else the raw id
    pub fn peer_name(&self, peer_id: &PeerId) -> String {
        self.registry
            .get(peer_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| peer_id.to_string())
    }

    // ------------------------------------------------------------------------
    // Transport Events
    // ------------------------------------------------------------------------

    /// Apply one transport event
    pub fn apply_event(&mut self, event: Event, now: Timestamp) -> Vec<StateChange> {
        self.stats.events_applied += 1;
        debug!("Applying {} event", event.kind());

        match event {
            Event::PeerDiscovered { peer_id, peer_name } => {
                self.handle_peer_discovered(peer_id, &peer_name, now)
            }
            Event::PeerConnected { peer_id, peer_name } => {
                self.handle_peer_connected(peer_id, &peer_name, now)
            }
            Event::PeerDisconnected { peer_id, peer_name } => {
                self.handle_peer_disconnected(peer_id, &peer_name)
            }
            Event::MessageReceived {
                sender_id,
                sender_name,
                text,
            } => {
                self.stats.messages_received += 1;
                let message = Message::inbound(sender_name.clone(), text, now, MessageKind::Text);
                self.append_inbound(sender_id, &sender_name, message)
            }
            Event::FileReceived {
                sender_id,
                sender_name,
                file_name,
                path,
            } => {
                debug!("File {} from {} stored at {}", file_name, sender_id, path);
                self.stats.files_received += 1;
                let message =
                    Message::inbound(sender_name.clone(), file_name, now, MessageKind::File);
                self.append_inbound(sender_id, &sender_name, message)
            }
            Event::TransportError { message } => {
                warn!("Transport reported error: {}", message);
                self.stats.transport_failures += 1;
                self.set_status(SessionStatus::TransportFailure {
                    operation: "Transport".to_string(),
                    reason: message,
                })
            }
        }
    }

    fn handle_peer_discovered(
        &mut self,
        peer_id: PeerId,
        peer_name: &str,
        now: Timestamp,
    ) -> Vec<StateChange> {
        let kind = match self.registry.upsert_discovered(peer_id.clone(), peer_name, now) {
            PeerChange::SelfFiltered => return Vec::new(),
            PeerChange::Inserted => {
                info!("Discovered peer {} ({})", peer_name, peer_id);
                PeerListChangeKind::Added
            }
            PeerChange::Refreshed { .. } => PeerListChangeKind::Refreshed,
        };
        vec![StateChange::PeerListChanged { peer_id, kind }]
    }

    fn handle_peer_connected(
        &mut self,
        peer_id: PeerId,
        peer_name: &str,
        now: Timestamp,
    ) -> Vec<StateChange> {
        if !self.registry.mark_connected(&peer_id, peer_name, now) {
            return Vec::new();
        }
        info!("Connected to {} ({})", peer_name, peer_id);

        let mut changes = vec![StateChange::PeerListChanged {
            peer_id: peer_id.clone(),
            kind: PeerListChangeKind::Connected,
        }];
        if let Some(change) = self.conversations.update_peer_status(&peer_id, true) {
            changes.push(conversation_changed(change));
        }
        if !self.first_connection_seen {
            self.first_connection_seen = true;
            let peer_name = self.peer_name(&peer_id);
            changes.push(StateChange::FirstConnection { peer_id, peer_name });
        }
        changes
    }

    fn handle_peer_disconnected(&mut self, peer_id: PeerId, peer_name: &str) -> Vec<StateChange> {
        if !self.registry.mark_disconnected(&peer_id) {
            debug!("Disconnect for unknown peer {} ({}), ignoring", peer_id, peer_name);
            return Vec::new();
        }
        info!("Disconnected from {} ({})", peer_name, peer_id);

        let mut changes = vec![StateChange::PeerListChanged {
            peer_id: peer_id.clone(),
            kind: PeerListChangeKind::Disconnected,
        }];
        if let Some(change) = self.conversations.update_peer_status(&peer_id, false) {
            changes.push(conversation_changed(change));
        }
        changes
    }

    fn append_inbound(
        &mut self,
        sender_id: PeerId,
        sender_name: &str,
        message: Message,
    ) -> Vec<StateChange> {
        let mut changes = self.ensure_conversation(&sender_id, sender_name);
        changes.extend(self.append(&sender_id, message));
        changes
    }

    /// Create the conversation if absent, seeding its status label from the registry
    fn ensure_conversation(&mut self, peer_id: &PeerId, peer_name: &str) -> Vec<StateChange> {
        let connected = self
            .registry
            .get(peer_id)
            .map(Peer::is_connected)
            .unwrap_or(false);
        let (_, created) = self.conversations.get_or_create(peer_id, peer_name);
        if !created {
            return Vec::new();
        }
        self.conversations.update_peer_status(peer_id, connected);
        vec![StateChange::ConversationChanged {
            peer_id: peer_id.clone(),
            kind: ConversationChangeKind::Created,
        }]
    }

    // ------------------------------------------------------------------------
    // Command Guards
    // ------------------------------------------------------------------------

    /// The peer must be known and not already connected
    pub fn check_connect(&self, peer_id: &PeerId) -> Result<(), CommandError> {
        match self.registry.get(peer_id) {
            None => Err(CommandError::UnknownPeer {
                peer_id: peer_id.clone(),
            }),
            Some(peer) if peer.is_connected() => Err(CommandError::AlreadyConnected {
                peer_id: peer_id.clone(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Text must be non-blank and the peer connected
    pub fn check_send_text(&self, peer_id: &PeerId, text: &str) -> Result<(), CommandError> {
        if text.trim().is_empty() {
            return Err(CommandError::BlankMessage);
        }
        self.check_connected(peer_id)
    }

    /// The path must name a file and the peer be connected
    ///
    /// Returns the display name recorded as the message content.
    pub fn check_send_file(&self, peer_id: &PeerId, path: &Path) -> Result<String, CommandError> {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| CommandError::InvalidFilePath {
                path: path.display().to_string(),
            })?;
        self.check_connected(peer_id)?;
        Ok(display_name)
    }

    fn check_connected(&self, peer_id: &PeerId) -> Result<(), CommandError> {
        match self.registry.get(peer_id) {
            Some(peer) if peer.is_connected() => Ok(()),
            _ => Err(CommandError::PeerNotConnected {
                peer_id: peer_id.clone(),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Command Outcomes
    // ------------------------------------------------------------------------

    /// Record a successfully sent text or file in the peer's conversation
    pub fn record_outgoing(
        &mut self,
        peer_id: &PeerId,
        content: String,
        kind: MessageKind,
        now: Timestamp,
    ) -> Vec<StateChange> {
        match kind {
            MessageKind::File | MessageKind::Image => self.stats.files_sent += 1,
            _ => self.stats.messages_sent += 1,
        }
        let peer_name = self.peer_name(peer_id);
        let mut changes = self.ensure_conversation(peer_id, &peer_name);
        let message = Message::outbound(self.local_name().to_string(), content, now, kind);
        changes.extend(self.append(peer_id, message));
        changes
    }

    fn append(&mut self, peer_id: &PeerId, message: Message) -> Option<StateChange> {
        let change = self.conversations.append_message(peer_id, message.clone())?;
        Some(StateChange::MessageAppended {
            peer_id: change.peer_id,
            message,
        })
    }

    /// The transport accepted a discovery request
    pub fn record_discovery_started(&mut self) -> Vec<StateChange> {
        self.is_discovering = true;
        Vec::new()
    }

    /// The transport started listening
    pub fn record_started(&mut self, address: Option<String>) -> Vec<StateChange> {
        self.set_status(SessionStatus::Listening { address })
    }

    /// The transport failed to start; the session keeps running
    pub fn record_start_failed(&mut self, error: &TransportError) -> Vec<StateChange> {
        self.stats.transport_failures += 1;
        self.set_status(SessionStatus::ConnectionFailed {
            reason: error.to_string(),
        })
    }

    /// A transport call failed; nothing else changes
    pub fn record_transport_failure(
        &mut self,
        operation: &str,
        error: &TransportError,
    ) -> Vec<StateChange> {
        self.stats.transport_failures += 1;
        self.set_status(SessionStatus::TransportFailure {
            operation: operation.to_string(),
            reason: error.to_string(),
        })
    }

    /// The session is shutting down
    pub fn record_stopped(&mut self) -> Vec<StateChange> {
        self.is_discovering = false;
        self.set_status(SessionStatus::Disconnected)
    }

    fn set_status(&mut self, status: SessionStatus) -> Vec<StateChange> {
        if self.status == status {
            return Vec::new();
        }
        self.status = status.clone();
        vec![StateChange::StatusChanged { status }]
    }

    // ------------------------------------------------------------------------
    // Conversation Commands
    // ------------------------------------------------------------------------

    /// Create the conversation if absent and select it
    pub fn start_conversation(&mut self, peer_id: &PeerId) -> Vec<StateChange> {
        let peer_name = self.peer_name(peer_id);
        let mut changes = self.ensure_conversation(peer_id, &peer_name);
        changes.extend(self.select(Some(peer_id.clone())));
        changes
    }

    /// Select an existing conversation; unread counts are left untouched
    pub fn select_conversation(
        &mut self,
        peer_id: &PeerId,
    ) -> Result<Vec<StateChange>, CommandError> {
        if !self.conversations.contains(peer_id) {
            return Err(CommandError::ConversationNotFound {
                peer_id: peer_id.clone(),
            });
        }
        Ok(self.select(Some(peer_id.clone())))
    }

    /// Remove a conversation (the peer stays known) and reselect if needed
    pub fn close_conversation(
        &mut self,
        peer_id: &PeerId,
    ) -> Result<Vec<StateChange>, CommandError> {
        let change = self
            .conversations
            .remove(peer_id)
            .ok_or_else(|| CommandError::ConversationNotFound {
                peer_id: peer_id.clone(),
            })?;
        let mut changes = vec![conversation_changed(change)];
        changes.extend(self.reselect_if_removed(peer_id));
        Ok(changes)
    }

    /// Reset the unread counter; absent conversations are ignored
    pub fn mark_read(&mut self, peer_id: &PeerId) -> Vec<StateChange> {
        self.conversations
            .mark_read(peer_id)
            .map(conversation_changed)
            .into_iter()
            .collect()
    }

    /// Drop a conversation's history while keeping the conversation open
    pub fn clear_conversation(
        &mut self,
        peer_id: &PeerId,
    ) -> Result<Vec<StateChange>, CommandError> {
        let change = self
            .conversations
            .clear(peer_id)
            .ok_or_else(|| CommandError::ConversationNotFound {
                peer_id: peer_id.clone(),
            })?;
        Ok(vec![conversation_changed(change)])
    }

    fn select(&mut self, selected: Option<PeerId>) -> Vec<StateChange> {
        if self.selected == selected {
            return Vec::new();
        }
        self.selected = selected.clone();
        vec![StateChange::SelectionChanged { selected }]
    }

    fn reselect_if_removed(&mut self, removed: &PeerId) -> Vec<StateChange> {
        if self.selected.as_ref() != Some(removed) {
            return Vec::new();
        }
        let next = self.conversations.first_id().cloned();
        self.select(next)
    }

    // ------------------------------------------------------------------------
    // Staleness Sweep
    // ------------------------------------------------------------------------

    /// Remove stale peers together with their conversations
    pub fn sweep(&mut self, now: Timestamp, stale_after: Duration) -> Vec<StateChange> {
        let removed = self.registry.sweep_stale(now, stale_after);
        if removed.is_empty() {
            return Vec::new();
        }

        let mut changes = Vec::new();
        for peer_id in &removed {
            changes.push(StateChange::PeerListChanged {
                peer_id: peer_id.clone(),
                kind: PeerListChangeKind::Removed,
            });
            if let Some(change) = self.conversations.remove(peer_id) {
                changes.push(conversation_changed(change));
                changes.extend(self.reselect_if_removed(peer_id));
            }
        }

        self.stats.peers_swept += removed.len() as u64;
        let remaining = self.registry.len();
        info!("Cleaned up {} stale peers, {} remaining", removed.len(), remaining);
        changes.extend(self.set_status(SessionStatus::CleanedUpPeers {
            removed: removed.len(),
            remaining,
        }));
        changes
    }

    // ------------------------------------------------------------------------
    // Read Models
    // ------------------------------------------------------------------------

    /// Owned copy of the observable state
    pub fn snapshot(&self, now: Timestamp) -> SessionSnapshot {
        SessionSnapshot {
            local_name: self.local_name().to_string(),
            peers: self.registry.all(),
            conversations: self.conversations.all(),
            selected: self.selected.clone(),
            status: self.status.clone(),
            is_discovering: self.is_discovering,
            stats: self.stats.clone(),
            taken_at: now,
        }
    }

    /// Full view of one conversation, including its messages
    pub fn conversation_view(&self, peer_id: &PeerId) -> Option<ConversationView> {
        self.conversations.get(peer_id).map(|c| c.view())
    }
}

fn conversation_changed(change: ConversationChange) -> StateChange {
    StateChange::ConversationChanged {
        peer_id: change.peer_id,
        kind: change.kind,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
