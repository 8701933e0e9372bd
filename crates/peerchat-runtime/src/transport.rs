//! Transport Service Interface
//!
//! Defines the seam between the session and the networking layer. The session
//! task owns its [`Transport`] exclusively and awaits every call inline, so a
//! call's failure is a synchronous result of the command that issued it.
//! Asynchronous notifications flow the other way through a cloneable
//! [`TransportEventSink`].

use peerchat_core::{Event, EventSender, PeerId, TransportError};
use std::path::Path;
use tracing::trace;

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Operations the session issues against the transport service
///
/// Implementations report connection progress and inbound traffic through the
/// [`TransportEventSink`] they were constructed with; a successful
/// `connect_to_peer` only means the attempt was accepted.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Start listening for peers
    async fn start(&mut self) -> Result<(), TransportError>;

    /// Stop all transport activity
    async fn stop(&mut self) -> Result<(), TransportError>;

    /// Broadcast a discovery announcement
    async fn discover_peers(&mut self) -> Result<(), TransportError>;

    /// Initiate a connection to a discovered peer
    async fn connect_to_peer(&mut self, peer_id: &PeerId) -> Result<(), TransportError>;

    /// Send a text message to a connected peer
    async fn send_text(&mut self, peer_id: &PeerId, text: &str) -> Result<(), TransportError>;

    /// Send a file to a connected peer
    async fn send_file(&mut self, peer_id: &PeerId, path: &Path) -> Result<(), TransportError>;

    /// Address the transport is listening on, for status display
    fn local_address(&self) -> Option<String> {
        None
    }
}

// ----------------------------------------------------------------------------
// Event Sink
// ----------------------------------------------------------------------------

/// Handle through which a transport posts events into the session mailbox
///
/// Callable from any thread or task; never blocks. Events posted after the
/// session has shut down are dropped.
#[derive(Debug, Clone)]
pub struct TransportEventSink {
    sender: EventSender,
}

impl TransportEventSink {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }

    /// Post an event to the session
    pub fn emit(&self, event: Event) {
        if let Err(rejected) = self.sender.send(event) {
            trace!("Session closed, dropping {} event", rejected.0.kind());
        }
    }

    /// Whether the session is no longer accepting events
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn peer_discovered(&self, peer_id: impl Into<PeerId>, peer_name: impl Into<String>) {
        self.emit(Event::PeerDiscovered {
            peer_id: peer_id.into(),
            peer_name: peer_name.into(),
        });
    }

    pub fn peer_connected(&self, peer_id: impl Into<PeerId>, peer_name: impl Into<String>) {
        self.emit(Event::PeerConnected {
            peer_id: peer_id.into(),
            peer_name: peer_name.into(),
        });
    }

    pub fn peer_disconnected(&self, peer_id: impl Into<PeerId>, peer_name: impl Into<String>) {
        self.emit(Event::PeerDisconnected {
            peer_id: peer_id.into(),
            peer_name: peer_name.into(),
        });
    }

    pub fn message_received(
        &self,
        sender_id: impl Into<PeerId>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.emit(Event::MessageReceived {
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            text: text.into(),
        });
    }

    pub fn file_received(
        &self,
        sender_id: impl Into<PeerId>,
        sender_name: impl Into<String>,
        file_name: impl Into<String>,
        path: impl Into<String>,
    ) {
        self.emit(Event::FileReceived {
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            file_name: file_name.into(),
            path: path.into(),
        });
    }

    pub fn transport_error(&self, message: impl Into<String>) {
        self.emit(Event::TransportError {
            message: message.into(),
        });
    }
}
