//! Interactive Prompt
//!
//! Line-oriented terminal interface over a [`SessionHandle`]. Input lines are
//! parsed into [`PromptCommand`]s and executed as session commands; state
//! change notifications are printed as they arrive. Plain text is sent to the
//! selected conversation.

use std::fmt::Write as _;
use std::path::PathBuf;

use peerchat_core::{
    ConversationView, LastSeen, Message, MessageKind, PeerId, PeerListChangeKind, SessionSnapshot,
    StateChange,
};
use peerchat_runtime::SessionHandle;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::config::CliConfig;
use crate::error::{CliError, Result};

pub const HELP: &str = "\
Commands:
  /peers                 list known peers
  /discover              run a discovery round now
  /connect <peer>        connect to a peer
  /open <peer>           open and select a conversation
  /select <peer>         select an open conversation
  /show [peer]           print a conversation
  /read [peer]           mark a conversation as read
  /clear [peer]          clear a conversation's messages
  /close [peer]          close a conversation
  /file <path>           send a file to the selected peer
  /status                show the session status
  /quit                  leave
Any other text is sent to the selected peer.";

// ----------------------------------------------------------------------------
// Command Parsing
// ----------------------------------------------------------------------------

/// A parsed input line
///
/// `None` targets fall back to the selected conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptCommand {
    Help,
    Peers,
    Discover,
    Connect(PeerId),
    Open(PeerId),
    Select(PeerId),
    Show(Option<PeerId>),
    Read(Option<PeerId>),
    Clear(Option<PeerId>),
    Close(Option<PeerId>),
    File(PathBuf),
    Status,
    Quit,
    Say(String),
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<PromptCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(PromptCommand::Say(line.to_string())));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };
    let optional_peer = || (!argument.is_empty()).then(|| PeerId::new(argument));
    let required_peer = || {
        optional_peer().ok_or_else(|| CliError::Input(format!("/{} needs a peer id", name)))
    };

    let command = match name {
        "help" | "?" => PromptCommand::Help,
        "peers" => PromptCommand::Peers,
        "discover" => PromptCommand::Discover,
        "connect" => PromptCommand::Connect(required_peer()?),
        "open" => PromptCommand::Open(required_peer()?),
        "select" => PromptCommand::Select(required_peer()?),
        "show" => PromptCommand::Show(optional_peer()),
        "read" => PromptCommand::Read(optional_peer()),
        "clear" => PromptCommand::Clear(optional_peer()),
        "close" => PromptCommand::Close(optional_peer()),
        "file" if argument.is_empty() => {
            return Err(CliError::Input("/file needs a path".to_string()))
        }
        "file" => PromptCommand::File(PathBuf::from(argument)),
        "status" => PromptCommand::Status,
        "quit" | "exit" => PromptCommand::Quit,
        other => return Err(CliError::Input(format!("unknown command /{}", other))),
    };
    Ok(Some(command))
}

/// Explicit target, else the selected conversation
fn resolve_target(target: Option<PeerId>, snapshot: &SessionSnapshot) -> Result<PeerId> {
    target
        .or_else(|| snapshot.selected.clone())
        .ok_or_else(|| CliError::Input("no conversation selected, use /open <peer>".to_string()))
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

pub fn format_message(message: &Message) -> String {
    match message.kind() {
        MessageKind::File => format!("{}: [file] {}", message.sender_name(), message.content()),
        MessageKind::Image => format!("{}: [image] {}", message.sender_name(), message.content()),
        MessageKind::System | MessageKind::Error => format!("* {}", message.content()),
        MessageKind::Text => format!("{}: {}", message.sender_name(), message.content()),
    }
}

pub fn format_peer_list(snapshot: &SessionSnapshot) -> String {
    if snapshot.peers.is_empty() {
        return "No peers discovered yet".to_string();
    }
    let mut out = String::new();
    for peer in &snapshot.peers {
        let seen = LastSeen::from_elapsed(snapshot.taken_at.duration_since(peer.last_seen));
        let _ = writeln!(
            out,
            "  {:<16} {:<12} {:<13} seen {}",
            peer.id.as_str(),
            peer.name,
            peer.status.to_string(),
            seen
        );
    }
    out.trim_end().to_string()
}

pub fn format_conversation(view: &ConversationView, limit: usize) -> String {
    let summary = &view.summary;
    let mut out = format!(
        "== {} ({}) {} messages, {} unread ==",
        summary.peer_name, summary.peer_status, summary.message_count, summary.unread_count
    );
    let skip = view.messages.len().saturating_sub(limit);
    for message in view.messages.iter().skip(skip) {
        out.push('\n');
        out.push_str(&format_message(message));
    }
    out
}

pub fn format_status(snapshot: &SessionSnapshot) -> String {
    let selected = snapshot
        .selected
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    let mut out = format!(
        "{} | {} | {} peers ({} connected) | {} unread | selected: {}",
        snapshot.local_name,
        snapshot.status,
        snapshot.peers.len(),
        snapshot.connected_count(),
        snapshot.total_unread(),
        selected
    );
    for conversation in &snapshot.conversations {
        let marker = if conversation.unread_count > 0 {
            format!(" ({})", conversation.unread_count)
        } else {
            String::new()
        };
        let _ = write!(out, "\n  [{}{}] {}", conversation.peer_name, marker, conversation.preview);
    }
    out
}

/// Notification line for a state change, if it is worth printing
pub fn describe_change(change: &StateChange, show_all: bool) -> Option<String> {
    match change {
        StateChange::FirstConnection { peer_name, .. } => {
            Some(format!("Connected to {}. Say hello!", peer_name))
        }
        StateChange::StatusChanged { status } => Some(format!("status: {}", status)),
        StateChange::PeerListChanged { peer_id, kind } => match kind {
            PeerListChangeKind::Connected => Some(format!("{} connected", peer_id)),
            PeerListChangeKind::Disconnected => Some(format!("{} disconnected", peer_id)),
            PeerListChangeKind::Removed => Some(format!("{} went away", peer_id)),
            PeerListChangeKind::Added if show_all => Some(format!("discovered {}", peer_id)),
            PeerListChangeKind::Added | PeerListChangeKind::Refreshed => None,
        },
        StateChange::SelectionChanged { selected } if show_all => Some(match selected {
            Some(peer_id) => format!("selected {}", peer_id),
            None => "no conversation selected".to_string(),
        }),
        StateChange::ConversationChanged { peer_id, kind } if show_all => {
            Some(format!("conversation {}: {:?}", peer_id, kind))
        }
        StateChange::MessageAppended { message, .. } if !message.is_from_me() => {
            Some(format_message(message))
        }
        StateChange::SelectionChanged { .. }
        | StateChange::ConversationChanged { .. }
        | StateChange::MessageAppended { .. } => None,
    }
}

// ----------------------------------------------------------------------------
// Prompt Loop
// ----------------------------------------------------------------------------

pub struct Prompt {
    handle: SessionHandle,
    config: CliConfig,
}

impl Prompt {
    pub fn new(handle: SessionHandle, config: CliConfig) -> Self {
        Self { handle, config }
    }

    /// Read commands from stdin until `/quit`, end of input or session stop
    pub async fn run(&self) -> Result<()> {
        let mut changes = self.handle.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        println!("{}", HELP);
        self.write_prompt(&mut stdout).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("End of input");
                        break;
                    };
                    match parse_line(&line) {
                        Ok(Some(PromptCommand::Quit)) => break,
                        Ok(Some(command)) => {
                            if let Err(e) = self.execute(command).await {
                                println!("error: {}", e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    }
                    self.write_prompt(&mut stdout).await?;
                }

                change = changes.recv() => match change {
                    Ok(change) => self.on_change(change),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Terminal fell behind, {} notifications skipped", missed);
                    }
                    Err(RecvError::Closed) => {
                        println!("Session stopped");
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    async fn write_prompt(&self, stdout: &mut tokio::io::Stdout) -> Result<()> {
        stdout.write_all(self.config.prompt.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    fn on_change(&self, change: StateChange) {
        if let Some(line) = describe_change(&change, self.config.show_all_changes) {
            println!("\n{}", line);
        }
    }

    pub async fn execute(&self, command: PromptCommand) -> Result<()> {
        match command {
            PromptCommand::Help => println!("{}", HELP),
            PromptCommand::Peers => {
                let snapshot = self.handle.snapshot().await?;
                println!("{}", format_peer_list(&snapshot));
            }
            PromptCommand::Discover => self.handle.discover_peers().await?,
            PromptCommand::Connect(peer_id) => self.handle.connect_to_peer(peer_id).await?,
            PromptCommand::Open(peer_id) => {
                self.handle.start_conversation(peer_id.clone()).await?;
                self.show(peer_id).await?;
            }
            PromptCommand::Select(peer_id) => self.handle.select_conversation(peer_id).await?,
            PromptCommand::Show(target) => {
                let peer_id = self.target(target).await?;
                self.show(peer_id).await?;
            }
            PromptCommand::Read(target) => {
                let peer_id = self.target(target).await?;
                self.handle.mark_read(peer_id).await?;
            }
            PromptCommand::Clear(target) => {
                let peer_id = self.target(target).await?;
                self.handle.clear_conversation(peer_id).await?;
            }
            PromptCommand::Close(target) => {
                let peer_id = self.target(target).await?;
                self.handle.close_conversation(peer_id).await?;
            }
            PromptCommand::File(path) => {
                let peer_id = self.target(None).await?;
                self.handle.send_file(peer_id, path).await?;
            }
            PromptCommand::Say(text) => {
                let peer_id = self.target(None).await?;
                self.handle.send_text(peer_id, text).await?;
            }
            PromptCommand::Status => {
                let snapshot = self.handle.snapshot().await?;
                println!("{}", format_status(&snapshot));
            }
            PromptCommand::Quit => {}
        }
        Ok(())
    }

    async fn target(&self, target: Option<PeerId>) -> Result<PeerId> {
        if let Some(peer_id) = target {
            return Ok(peer_id);
        }
        let snapshot = self.handle.snapshot().await?;
        resolve_target(None, &snapshot)
    }

    async fn show(&self, peer_id: PeerId) -> Result<()> {
        match self.handle.conversation(peer_id.clone()).await? {
            Some(view) => {
                let limit = self.config.max_recent_messages;
                println!("{}", format_conversation(&view, limit));
            }
            None => println!("No conversation with {}", peer_id),
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
