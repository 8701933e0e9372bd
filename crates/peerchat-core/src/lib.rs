//! Peerchat Session Core
//!
//! This crate provides the state model of the peerchat peer-to-peer chat
//! client: peer tracking with staleness sweeps, per-peer conversations with
//! bounded history and unread counting, and the [`SessionState`] that applies
//! transport events and command outcomes atomically. It performs no I/O; the
//! runtime crate owns the session task, timers and the transport.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod channel;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod history;
pub mod message;
pub mod peer;
pub mod registry;
pub mod session;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use channel::{
    create_event_channel, create_state_change_channel, Event, EventReceiver, EventSender,
    PeerListChangeKind, SessionStatus, StateChange, StateChangeReceiver, StateChangeSender,
};
pub use config::{ChannelConfig, SessionConfig};
pub use conversation::{
    Conversation, ConversationChange, ConversationChangeKind, ConversationStore,
    ConversationSummary, ConversationView,
};
pub use errors::{
    CommandError, ConfigError, PeerchatError, PeerchatResult, TransportError,
};
pub use history::{MessageHistoryBuffer, DEFAULT_HISTORY_CAPACITY};
pub use message::{Message, MessageKind, PREVIEW_MAX_CHARS};
pub use peer::{LastSeen, Peer, PeerStatus};
pub use registry::{PeerChange, PeerRegistry, DEFAULT_STALE_AFTER};
pub use session::{SessionSnapshot, SessionState, SessionStats};
pub use types::{ManualTimeSource, PeerId, SystemTimeSource, TimeSource, Timestamp};
