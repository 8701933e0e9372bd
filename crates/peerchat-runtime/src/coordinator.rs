//! Session Coordinator Task
//!
//! The single writer of [`SessionState`]. One `tokio::select!` loop consumes
//! transport events, UI commands and the two periodic ticks, applying each to
//! the state one at a time and broadcasting the resulting [`StateChange`]s.
//! Pending transport events take priority over commands so that a command
//! always observes every event posted before it.

use crate::command::{CommandReceiver, SessionCommand};
use crate::transport::Transport;
use peerchat_core::{
    CommandError, Event, EventReceiver, MessageKind, PeerId, SessionConfig, SessionState,
    StateChange, StateChangeSender, TimeSource, TransportError,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

// ----------------------------------------------------------------------------
// Session Coordinator
// ----------------------------------------------------------------------------

/// The task that owns all session state
pub struct SessionCoordinator {
    /// Session state (only touched by this task)
    state: SessionState,
    /// Transport service, awaited inline
    transport: Box<dyn Transport>,
    /// Source of "now" for state transitions
    time_source: Arc<dyn TimeSource>,
    /// Channel for receiving commands from session handles
    command_receiver: CommandReceiver,
    /// Mailbox for transport events
    event_receiver: EventReceiver,
    /// Fan-out of applied changes
    notifier: StateChangeSender,
    config: SessionConfig,
    /// Whether the task should continue running
    running: bool,
}

impl SessionCoordinator {
    /// Create a new coordinator
    pub fn new(
        config: SessionConfig,
        transport: Box<dyn Transport>,
        time_source: Arc<dyn TimeSource>,
        command_receiver: CommandReceiver,
        event_receiver: EventReceiver,
        notifier: StateChangeSender,
    ) -> Self {
        Self {
            state: SessionState::new(&config),
            transport,
            time_source,
            command_receiver,
            event_receiver,
            notifier,
            config,
            running: true,
        }
    }

    /// Run the session loop until shutdown
    pub async fn run(mut self) {
        info!("Session for {} starting", self.state.local_name());
        self.start_transport().await;
        self.discovery_tick().await;

        let mut discovery = new_interval(self.config.discovery_interval());
        let mut cleanup = new_interval(self.config.cleanup_interval());
        let mut events_open = true;
        let mut shutdown_reply = None;

        while self.running {
            tokio::select! {
                biased;

                event = self.event_receiver.recv(), if events_open => {
                    match event {
                        Some(event) => self.process_event(event),
                        None => {
                            debug!("All event sinks dropped");
                            events_open = false;
                        }
                    }
                }

                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => {
                            shutdown_reply = self.process_command(command).await;
                        }
                        None => {
                            info!("All session handles dropped, shutting down");
                            self.running = false;
                        }
                    }
                }

                _ = discovery.tick() => self.discovery_tick().await,

                _ = cleanup.tick() => self.cleanup_tick(),
            }
        }

        self.shutdown().await;
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn start_transport(&mut self) {
        let changes = match self.transport.start().await {
            Ok(()) => {
                let address = self.transport.local_address();
                info!("Transport listening on {}", address.as_deref().unwrap_or("unknown address"));
                self.state.record_started(address)
            }
            Err(e) => {
                warn!("Transport failed to start: {}", e);
                self.state.record_start_failed(&e)
            }
        };
        self.broadcast(changes);
    }

    async fn shutdown(&mut self) {
        info!("Session shutting down");

        if let Err(e) = self.transport.stop().await {
            warn!("Transport failed to stop cleanly: {}", e);
        }

        // Late sink sends now fail silently
        self.event_receiver.close();
        let mut discarded = 0usize;
        while self.event_receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            info!("Discarded {} unapplied transport events", discarded);
        }

        let changes = self.state.record_stopped();
        self.broadcast(changes);
        info!("Session stopped");
    }

    // ------------------------------------------------------------------------
    // Mailbox Processing
    // ------------------------------------------------------------------------

    fn process_event(&mut self, event: Event) {
        let now = self.time_source.now();
        let changes = self.state.apply_event(event, now);
        self.broadcast(changes);
    }

    /// Apply one command; a shutdown request stops the loop and hands back
    /// its reply, which is sent once the transport has been stopped
    async fn process_command(&mut self, command: SessionCommand) -> Option<oneshot::Sender<()>> {
        debug!("Processing {} command", command.name());

        match command {
            SessionCommand::DiscoverPeers { reply } => {
                let result = self.discover_peers().await;
                let _ = reply.send(result);
            }
            SessionCommand::ConnectToPeer { peer_id, reply } => {
                let result = self.connect_to_peer(&peer_id).await;
                let _ = reply.send(result);
            }
            SessionCommand::SendText {
                peer_id,
                text,
                reply,
            } => {
                let result = self.send_text(&peer_id, text).await;
                let _ = reply.send(result);
            }
            SessionCommand::SendFile {
                peer_id,
                path,
                reply,
            } => {
                let result = self.send_file(&peer_id, &path).await;
                let _ = reply.send(result);
            }
            SessionCommand::StartConversation { peer_id, reply } => {
                let changes = self.state.start_conversation(&peer_id);
                self.broadcast(changes);
                let _ = reply.send(Ok(()));
            }
            SessionCommand::CloseConversation { peer_id, reply } => {
                let result = self.state.close_conversation(&peer_id).map(|changes| {
                    self.broadcast(changes);
                });
                let _ = reply.send(result);
            }
            SessionCommand::SelectConversation { peer_id, reply } => {
                let result = self.state.select_conversation(&peer_id).map(|changes| {
                    self.broadcast(changes);
                });
                let _ = reply.send(result);
            }
            SessionCommand::MarkRead { peer_id, reply } => {
                let changes = self.state.mark_read(&peer_id);
                self.broadcast(changes);
                let _ = reply.send(Ok(()));
            }
            SessionCommand::ClearConversation { peer_id, reply } => {
                let result = self.state.clear_conversation(&peer_id).map(|changes| {
                    self.broadcast(changes);
                });
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot(self.time_source.now()));
            }
            SessionCommand::Conversation { peer_id, reply } => {
                let _ = reply.send(self.state.conversation_view(&peer_id));
            }
            SessionCommand::Shutdown { reply } => {
                self.running = false;
                return Some(reply);
            }
        }
        None
    }

    // ------------------------------------------------------------------------
    // Command Handlers
    // ------------------------------------------------------------------------

    async fn discover_peers(&mut self) -> Result<(), CommandError> {
        match self.transport.discover_peers().await {
            Ok(()) => {
                let changes = self.state.record_discovery_started();
                self.broadcast(changes);
                Ok(())
            }
            Err(e) => Err(self.transport_failed("Discovery", e)),
        }
    }

    async fn connect_to_peer(&mut self, peer_id: &PeerId) -> Result<(), CommandError> {
        self.state.check_connect(peer_id)?;
        self.transport
            .connect_to_peer(peer_id)
            .await
            .map_err(|e| self.transport_failed("Connect", e))
    }

    async fn send_text(&mut self, peer_id: &PeerId, text: String) -> Result<(), CommandError> {
        self.state.check_send_text(peer_id, &text)?;
        if let Err(e) = self.transport.send_text(peer_id, &text).await {
            return Err(self.transport_failed("Send", e));
        }
        let now = self.time_source.now();
        let changes = self
            .state
            .record_outgoing(peer_id, text, MessageKind::Text, now);
        self.broadcast(changes);
        Ok(())
    }

    async fn send_file(&mut self, peer_id: &PeerId, path: &Path) -> Result<(), CommandError> {
        let display_name = self.state.check_send_file(peer_id, path)?;
        if let Err(e) = self.transport.send_file(peer_id, path).await {
            return Err(self.transport_failed("File transfer", e));
        }
        let now = self.time_source.now();
        let changes = self
            .state
            .record_outgoing(peer_id, display_name, MessageKind::File, now);
        self.broadcast(changes);
        Ok(())
    }

    /// Log and surface a transport failure; no other state changes
    fn transport_failed(&mut self, operation: &str, error: TransportError) -> CommandError {
        warn!("{} failed: {}", operation, error);
        let changes = self.state.record_transport_failure(operation, &error);
        self.broadcast(changes);
        CommandError::Transport(error)
    }

    // ------------------------------------------------------------------------
    // Periodic Ticks
    // ------------------------------------------------------------------------

    async fn discovery_tick(&mut self) {
        trace!("Discovery tick");
        // Failures are already logged and reflected in the status line
        let _ = self.discover_peers().await;
    }

    fn cleanup_tick(&mut self) {
        trace!("Cleanup tick");
        let now = self.time_source.now();
        let changes = self.state.sweep(now, self.config.stale_after());
        self.broadcast(changes);
    }

    fn broadcast(&self, changes: Vec<StateChange>) {
        for change in changes {
            trace!("Broadcasting {:?}", change);
            // No subscribers is not an error
            let _ = self.notifier.send(change);
        }
    }
}

/// Interval whose first tick is one full period from now
fn new_interval(period: time::Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
