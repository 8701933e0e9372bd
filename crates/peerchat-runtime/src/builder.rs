//! Session Builder API
//!
//! Creates the session channels up front so that a transport can be handed
//! its [`TransportEventSink`] before the session task is spawned.

use crate::command::create_command_channel;
use crate::coordinator::SessionCoordinator;
use crate::handle::SessionHandle;
use crate::transport::{Transport, TransportEventSink};
use peerchat_core::{
    create_event_channel, create_state_change_channel, EventReceiver, EventSender,
    PeerchatResult, SessionConfig, SystemTimeSource, TimeSource,
};
use std::sync::Arc;
use tracing::info;

// ----------------------------------------------------------------------------
// Session Builder
// ----------------------------------------------------------------------------

/// Builder for a running chat session
pub struct SessionBuilder {
    config: SessionConfig,
    time_source: Arc<dyn TimeSource>,
    event_sender: EventSender,
    event_receiver: EventReceiver,
}

impl SessionBuilder {
    /// Create a new session builder
    pub fn new(config: SessionConfig) -> Self {
        let (event_sender, event_receiver) = create_event_channel();
        Self {
            config,
            time_source: Arc::new(SystemTimeSource),
            event_sender,
            event_receiver,
        }
    }

    /// Replace the wall clock, e.g. with a `ManualTimeSource` in tests
    pub fn with_time_source(mut self, time_source: impl TimeSource) -> Self {
        self.time_source = Arc::new(time_source);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sink for the transport to post events into this session
    pub fn event_sink(&self) -> TransportEventSink {
        TransportEventSink::new(self.event_sender.clone())
    }

    /// Validate the configuration and spawn the session task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, transport: impl Transport) -> PeerchatResult<SessionHandle> {
        self.config.validate()?;
        info!("Starting session for {}", self.config.local_name);

        let (command_sender, command_receiver) =
            create_command_channel(self.config.channels.command_buffer_size);
        let (notifier, _initial_receiver) = create_state_change_channel(&self.config.channels);

        let coordinator = SessionCoordinator::new(
            self.config,
            Box::new(transport),
            self.time_source,
            command_receiver,
            self.event_receiver,
            notifier.clone(),
        );
        tokio::spawn(coordinator.run());

        Ok(SessionHandle::new(command_sender, notifier))
    }
}
