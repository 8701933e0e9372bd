//! Peerchat Session Runtime
//!
//! This crate runs the peerchat session layer:
//! - `SessionCoordinator`: the single task that owns all session state
//! - `Transport` / `TransportEventSink`: the seam to the networking layer
//! - `SessionHandle`: the command surface and change subscription
//! - `SessionBuilder`: wiring of channels, clock and transport
//!
//! The state model itself lives in `peerchat-core`.

pub mod builder;
pub mod command;
pub mod coordinator;
pub mod handle;
pub mod transport;

pub use builder::SessionBuilder;
pub use command::{create_command_channel, CommandReply, SessionCommand};
pub use coordinator::SessionCoordinator;
pub use handle::SessionHandle;
pub use transport::{Transport, TransportEventSink};

// Re-export core types for convenience
pub use peerchat_core::{
    CommandError, ConversationChangeKind, ConversationSummary, ConversationView, Event,
    ManualTimeSource, Message, MessageKind, Peer, PeerId, PeerListChangeKind, PeerStatus,
    PeerchatError, PeerchatResult, SessionConfig, SessionSnapshot, SessionStatus, StateChange,
    StateChangeReceiver, TimeSource, Timestamp, TransportError,
};
