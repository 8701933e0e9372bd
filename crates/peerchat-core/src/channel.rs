//! Session Channel Protocol
//!
//! Typed messages flowing into and out of the session task:
//! - [`Event`]: Transport → Session (asynchronous notifications, unbounded mailbox)
//! - [`StateChange`]: Session → UI (broadcast fan-out of applied mutations)
//!
//! Commands carry one-shot reply channels and live in the runtime crate.

use crate::config::ChannelConfig;
use crate::conversation::ConversationChangeKind;
use crate::message::Message;
use crate::types::PeerId;
use core::fmt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

// ----------------------------------------------------------------------------
// Event: Transport → Session
// ----------------------------------------------------------------------------

/// Notifications raised by the transport service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A peer announced itself
    PeerDiscovered { peer_id: PeerId, peer_name: String },
    /// A connection to a peer was established
    PeerConnected { peer_id: PeerId, peer_name: String },
    /// A connection to a peer was lost
    PeerDisconnected { peer_id: PeerId, peer_name: String },
    /// A text message arrived
    MessageReceived {
        sender_id: PeerId,
        sender_name: String,
        text: String,
    },
    /// A file transfer completed
    FileReceived {
        sender_id: PeerId,
        sender_name: String,
        file_name: String,
        path: String,
    },
    /// The transport hit an error outside of any command
    TransportError { message: String },
}

impl Event {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PeerDiscovered { .. } => "PeerDiscovered",
            Event::PeerConnected { .. } => "PeerConnected",
            Event::PeerDisconnected { .. } => "PeerDisconnected",
            Event::MessageReceived { .. } => "MessageReceived",
            Event::FileReceived { .. } => "FileReceived",
            Event::TransportError { .. } => "TransportError",
        }
    }
}

// ----------------------------------------------------------------------------
// StateChange: Session → UI
// ----------------------------------------------------------------------------

/// Kind of peer list mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerListChangeKind {
    Added,
    Refreshed,
    Connected,
    Disconnected,
    Removed,
}

/// Change notifications describing applied session mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// The peer list changed
    PeerListChanged {
        peer_id: PeerId,
        kind: PeerListChangeKind,
    },
    /// A conversation changed
    ConversationChanged {
        peer_id: PeerId,
        kind: ConversationChangeKind,
    },
    /// A message was appended to a conversation; carries a copy of it
    MessageAppended { peer_id: PeerId, message: Message },
    /// The selected conversation changed
    SelectionChanged { selected: Option<PeerId> },
    /// The first peer connection of this session
    FirstConnection { peer_id: PeerId, peer_name: String },
    /// The status line changed
    StatusChanged { status: SessionStatus },
}

// ----------------------------------------------------------------------------
// Session Status
// ----------------------------------------------------------------------------

/// Human-readable connection status of the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Not started yet, or stopped
    #[default]
    Disconnected,
    /// Transport started and accepting connections
    Listening { address: Option<String> },
    /// Transport failed to start
    ConnectionFailed { reason: String },
    /// A transport operation failed
    TransportFailure { operation: String, reason: String },
    /// The cleanup tick removed stale peers
    CleanedUpPeers { removed: usize, remaining: usize },
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Disconnected => write!(f, "Disconnected"),
            SessionStatus::Listening { address: Some(addr) } => write!(f, "Listening on {addr}"),
            SessionStatus::Listening { address: None } => write!(f, "Listening"),
            SessionStatus::ConnectionFailed { reason } => write!(f, "Connection failed: {reason}"),
            SessionStatus::TransportFailure { operation, reason } => {
                write!(f, "{operation} failed: {reason}")
            }
            SessionStatus::CleanedUpPeers { removed, remaining } => {
                write!(f, "Cleaned up {removed} stale peers, {remaining} remaining")
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Channel Types
// ----------------------------------------------------------------------------

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;
pub type StateChangeSender = broadcast::Sender<StateChange>;
pub type StateChangeReceiver = broadcast::Receiver<StateChange>;

// ----------------------------------------------------------------------------
// Channel Creation Utilities
// ----------------------------------------------------------------------------

/// Create the unbounded event mailbox (Transport → Session)
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Create the broadcast notification channel (One-to-Many: Session → UI)
///
/// Further receivers are created with `sender.subscribe()`.
pub fn create_state_change_channel(
    config: &ChannelConfig,
) -> (StateChangeSender, StateChangeReceiver) {
    broadcast::channel(config.notification_buffer_size.max(1))
}
