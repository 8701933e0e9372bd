//! Session Commands
//!
//! Requests sent from a [`crate::SessionHandle`] to the session task. Each
//! carries a one-shot reply channel so the caller gets the outcome of exactly
//! its own request.

use peerchat_core::{CommandError, ConversationView, PeerId, SessionSnapshot};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// Reply channel for commands that only report success or rejection
pub type CommandReply = oneshot::Sender<Result<(), CommandError>>;

pub type CommandSender = mpsc::Sender<SessionCommand>;
pub type CommandReceiver = mpsc::Receiver<SessionCommand>;

/// Commands processed by the session task
#[derive(Debug)]
pub enum SessionCommand {
    DiscoverPeers {
        reply: CommandReply,
    },
    ConnectToPeer {
        peer_id: PeerId,
        reply: CommandReply,
    },
    SendText {
        peer_id: PeerId,
        text: String,
        reply: CommandReply,
    },
    SendFile {
        peer_id: PeerId,
        path: PathBuf,
        reply: CommandReply,
    },
    StartConversation {
        peer_id: PeerId,
        reply: CommandReply,
    },
    CloseConversation {
        peer_id: PeerId,
        reply: CommandReply,
    },
    SelectConversation {
        peer_id: PeerId,
        reply: CommandReply,
    },
    MarkRead {
        peer_id: PeerId,
        reply: CommandReply,
    },
    ClearConversation {
        peer_id: PeerId,
        reply: CommandReply,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Conversation {
        peer_id: PeerId,
        reply: oneshot::Sender<Option<ConversationView>>,
    },
    /// Stop the session; the reply fires once the mailbox has been drained
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl SessionCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::DiscoverPeers { .. } => "DiscoverPeers",
            SessionCommand::ConnectToPeer { .. } => "ConnectToPeer",
            SessionCommand::SendText { .. } => "SendText",
            SessionCommand::SendFile { .. } => "SendFile",
            SessionCommand::StartConversation { .. } => "StartConversation",
            SessionCommand::CloseConversation { .. } => "CloseConversation",
            SessionCommand::SelectConversation { .. } => "SelectConversation",
            SessionCommand::MarkRead { .. } => "MarkRead",
            SessionCommand::ClearConversation { .. } => "ClearConversation",
            SessionCommand::Snapshot { .. } => "Snapshot",
            SessionCommand::Conversation { .. } => "Conversation",
            SessionCommand::Shutdown { .. } => "Shutdown",
        }
    }
}

/// Create the bounded command channel (UI → Session)
pub fn create_command_channel(buffer_size: usize) -> (CommandSender, CommandReceiver) {
    mpsc::channel(buffer_size.max(1))
}
