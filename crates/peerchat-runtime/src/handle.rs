//! Session Handle
//!
//! The command surface of a running session. Handles are cheap to clone; the
//! session shuts down when [`SessionHandle::shutdown`] is called or when the
//! last handle is dropped.

use crate::command::{CommandSender, SessionCommand};
use peerchat_core::{
    CommandError, ConversationView, PeerId, SessionSnapshot, StateChangeReceiver,
    StateChangeSender,
};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::info;

/// Handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_sender: CommandSender,
    notifier: StateChangeSender,
}

impl SessionHandle {
    pub(crate) fn new(command_sender: CommandSender, notifier: StateChangeSender) -> Self {
        Self {
            command_sender,
            notifier,
        }
    }

    /// Subscribe to change notifications
    ///
    /// Slow subscribers lose the oldest notifications instead of blocking the
    /// session; re-read a [`SessionSnapshot`] after a lag.
    pub fn subscribe(&self) -> StateChangeReceiver {
        self.notifier.subscribe()
    }

    /// Whether the session task is still accepting commands
    pub fn is_running(&self) -> bool {
        !self.command_sender.is_closed()
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Ask the transport to broadcast a discovery announcement
    pub async fn discover_peers(&self) -> Result<(), CommandError> {
        self.request(|reply| SessionCommand::DiscoverPeers { reply })
            .await?
    }

    /// Connect to a known, not yet connected peer
    pub async fn connect_to_peer(&self, peer_id: impl Into<PeerId>) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::ConnectToPeer { peer_id, reply })
            .await?
    }

    /// Send a text message to a connected peer
    pub async fn send_text(
        &self,
        peer_id: impl Into<PeerId>,
        text: impl Into<String>,
    ) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        let text = text.into();
        self.request(|reply| SessionCommand::SendText {
            peer_id,
            text,
            reply,
        })
        .await?
    }

    /// Send a file to a connected peer
    pub async fn send_file(
        &self,
        peer_id: impl Into<PeerId>,
        path: impl Into<PathBuf>,
    ) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        let path = path.into();
        self.request(|reply| SessionCommand::SendFile {
            peer_id,
            path,
            reply,
        })
        .await?
    }

    /// Open (creating if needed) and select the conversation with a peer
    pub async fn start_conversation(&self, peer_id: impl Into<PeerId>) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::StartConversation { peer_id, reply })
            .await?
    }

    /// Close a conversation and discard its history
    pub async fn close_conversation(&self, peer_id: impl Into<PeerId>) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::CloseConversation { peer_id, reply })
            .await?
    }

    /// Select an existing conversation without marking it read
    pub async fn select_conversation(
        &self,
        peer_id: impl Into<PeerId>,
    ) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::SelectConversation { peer_id, reply })
            .await?
    }

    /// Reset the unread counter of a conversation
    pub async fn mark_read(&self, peer_id: impl Into<PeerId>) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::MarkRead { peer_id, reply })
            .await?
    }

    /// Drop the message history of a conversation
    pub async fn clear_conversation(&self, peer_id: impl Into<PeerId>) -> Result<(), CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::ClearConversation { peer_id, reply })
            .await?
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Owned copy of the current session state
    pub async fn snapshot(&self) -> Result<SessionSnapshot, CommandError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Full view of one conversation, if it exists
    pub async fn conversation(
        &self,
        peer_id: impl Into<PeerId>,
    ) -> Result<Option<ConversationView>, CommandError> {
        let peer_id = peer_id.into();
        self.request(|reply| SessionCommand::Conversation { peer_id, reply })
            .await
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Stop the session and wait until the transport has been stopped
    ///
    /// Calling this on an already stopped session is a no-op.
    pub async fn shutdown(&self) {
        info!("Shutting down session");
        if self
            .request(|reply| SessionCommand::Shutdown { reply })
            .await
            .is_err()
        {
            info!("Session was already stopped");
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, CommandError> {
        let (reply, response) = oneshot::channel();
        self.command_sender
            .send(build(reply))
            .await
            .map_err(|_| CommandError::SessionClosed)?;
        response.await.map_err(|_| CommandError::SessionClosed)
    }
}
