//! Integration Tests for the Session Coordinator
//!
//! Drives a full session task through `SessionHandle` and `TransportEventSink`
//! against a recording transport. Tokio time is paused so the discovery and
//! cleanup ticks are deterministic; peer timestamps come from a
//! `ManualTimeSource` advanced by hand.

use peerchat_runtime::{
    CommandError, ConversationChangeKind, ManualTimeSource, MessageKind, PeerId,
    PeerListChangeKind, PeerStatus, SessionBuilder, SessionConfig, SessionHandle, SessionStatus,
    StateChange, StateChangeReceiver, Timestamp, Transport, TransportError, TransportEventSink,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

/// A call made against the transport
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Start,
    Stop,
    Discover,
    Connect(PeerId),
    SendText(PeerId, String),
    SendFile(PeerId, String),
}

#[derive(Default)]
struct Recorded {
    calls: Vec<Call>,
    failures: HashMap<&'static str, TransportError>,
    /// Peers reported as disconnected while stopping
    disconnect_on_stop: Vec<(PeerId, TransportEventSink)>,
}

/// Transport that records every call and fails on demand
#[derive(Clone, Default)]
struct RecordingTransport {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingTransport {
    fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn fail(&self, operation: &'static str, error: TransportError) {
        self.inner.lock().unwrap().failures.insert(operation, error);
    }

    fn disconnect_on_stop(&self, peer_id: PeerId, sink: TransportEventSink) {
        self.inner
            .lock()
            .unwrap()
            .disconnect_on_stop
            .push((peer_id, sink));
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        match inner.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn start(&mut self) -> Result<(), TransportError> {
        self.record("start", Call::Start)
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        let pending = std::mem::take(&mut self.inner.lock().unwrap().disconnect_on_stop);
        for (peer_id, sink) in pending {
            sink.peer_disconnected(peer_id, "stopping");
        }
        self.record("stop", Call::Stop)
    }

    async fn discover_peers(&mut self) -> Result<(), TransportError> {
        self.record("discover", Call::Discover)
    }

    async fn connect_to_peer(&mut self, peer_id: &PeerId) -> Result<(), TransportError> {
        self.record("connect", Call::Connect(peer_id.clone()))
    }

    async fn send_text(&mut self, peer_id: &PeerId, text: &str) -> Result<(), TransportError> {
        self.record("send_text", Call::SendText(peer_id.clone(), text.to_string()))
    }

    async fn send_file(&mut self, peer_id: &PeerId, path: &Path) -> Result<(), TransportError> {
        self.record(
            "send_file",
            Call::SendFile(peer_id.clone(), path.display().to_string()),
        )
    }

    fn local_address(&self) -> Option<String> {
        Some("127.0.0.1:7777".to_string())
    }
}

struct TestSession {
    handle: SessionHandle,
    sink: TransportEventSink,
    transport: RecordingTransport,
    clock: ManualTimeSource,
}

fn start_session_with(config: SessionConfig, transport: RecordingTransport) -> TestSession {
    let clock = ManualTimeSource::new(Timestamp::new(1_000_000));
    let builder = SessionBuilder::new(config).with_time_source(clock.clone());
    let sink = builder.event_sink();
    let handle = builder
        .start(transport.clone())
        .expect("test config is valid");
    TestSession {
        handle,
        sink,
        transport,
        clock,
    }
}

fn start_session() -> TestSession {
    start_session_with(SessionConfig::new("Morgan"), RecordingTransport::default())
}

async fn next_change(receiver: &mut StateChangeReceiver) -> StateChange {
    timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("change should arrive within timeout")
        .expect("notification channel open")
}

/// Every notification already broadcast
fn drain(receiver: &mut StateChangeReceiver) -> Vec<StateChange> {
    let mut changes = Vec::new();
    while let Ok(change) = receiver.try_recv() {
        changes.push(change);
    }
    changes
}

fn alice() -> PeerId {
    PeerId::new("alice-1")
}

// ----------------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_reports_listening_and_discovers() {
    let session = start_session();

    let snapshot = session.handle.snapshot().await.expect("session running");
    assert_eq!(
        snapshot.status,
        SessionStatus::Listening {
            address: Some("127.0.0.1:7777".into())
        }
    );
    assert!(snapshot.is_discovering);

    let calls = session.transport.calls();
    assert_eq!(calls[0], Call::Start);
    assert_eq!(calls[1], Call::Discover);
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_is_not_fatal() {
    let transport = RecordingTransport::default();
    transport.fail("start", TransportError::network("no interface"));
    let session = start_session_with(SessionConfig::new("Morgan"), transport);

    let snapshot = session.handle.snapshot().await.expect("session keeps running");
    assert!(matches!(snapshot.status, SessionStatus::ConnectionFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_discovery_tick_repeats() {
    let session = start_session();

    tokio::time::sleep(Duration::from_millis(10_500)).await;

    let discoveries = session
        .transport
        .calls()
        .into_iter()
        .filter(|c| *c == Call::Discover)
        .count();
    // startup discovery plus ticks at 5s and 10s
    assert_eq!(discoveries, 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_transport_and_rejects_commands() {
    let session = start_session();
    session.handle.shutdown().await;

    assert!(session.transport.calls().contains(&Call::Stop));
    assert!(!session.handle.is_running());
    assert_eq!(
        session.handle.discover_peers().await,
        Err(CommandError::SessionClosed)
    );

    // Late transport callbacks are dropped silently
    session.sink.peer_discovered("late", "Late");
    assert!(session.sink.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_events_raised_while_stopping_are_discarded() {
    let session = start_session();
    let mut changes = session.handle.subscribe();
    session.sink.peer_discovered(alice(), "Alice");
    session.sink.peer_connected(alice(), "Alice");
    session
        .transport
        .disconnect_on_stop(alice(), session.sink.clone());
    session.handle.snapshot().await.expect("running");
    drain(&mut changes);

    session.handle.shutdown().await;

    // The disconnect posted during stop() is never applied
    assert_eq!(
        drain(&mut changes),
        vec![StateChange::StatusChanged {
            status: SessionStatus::Disconnected
        }]
    );
    assert!(session.sink.is_closed());
    assert_eq!(session.transport.calls().last(), Some(&Call::Stop));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_all_handles_shuts_down() {
    let session = start_session();
    let transport = session.transport.clone();
    let sink = session.sink.clone();
    drop(session);

    for _ in 0..10 {
        if transport.calls().contains(&Call::Stop) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(transport.calls().contains(&Call::Stop));
    assert!(sink.is_closed());
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_connect_to_unknown_peer_does_not_call_transport() {
    let session = start_session();

    let result = session.handle.connect_to_peer("ghost").await;
    assert_eq!(
        result,
        Err(CommandError::UnknownPeer {
            peer_id: PeerId::new("ghost")
        })
    );
    assert!(!session
        .transport
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Connect(_))));
}

#[tokio::test(start_paused = true)]
async fn test_connect_rejected_when_already_connected() {
    let session = start_session();
    session.sink.peer_discovered(alice(), "Alice");

    session
        .handle
        .connect_to_peer(alice())
        .await
        .expect("discovered peer can be connected");
    assert!(session.transport.calls().contains(&Call::Connect(alice())));

    session.sink.peer_connected(alice(), "Alice");
    assert_eq!(
        session.handle.connect_to_peer(alice()).await,
        Err(CommandError::AlreadyConnected { peer_id: alice() })
    );
}

#[tokio::test(start_paused = true)]
async fn test_alice_scenario() {
    let session = start_session();
    let handle = &session.handle;

    session.sink.peer_discovered(alice(), "Alice");
    session.sink.peer_connected(alice(), "Alice");

    handle.send_text(alice(), "hi").await.expect("alice is connected");
    session
        .sink
        .message_received(alice(), "Alice", "hello");

    let view = handle
        .conversation(alice())
        .await
        .expect("session running")
        .expect("conversation created");
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.summary.unread_count, 1);
    assert_eq!(view.summary.peer_status, PeerStatus::Connected);
    assert_eq!(view.messages[0].content(), "hi");
    assert_eq!(view.messages[0].sender_name(), "Morgan");
    assert!(view.messages[0].is_from_me());

    handle.mark_read(alice()).await.expect("mark read");
    let snapshot = handle.snapshot().await.expect("session running");
    assert_eq!(snapshot.total_unread(), 0);
    assert_eq!(snapshot.stats.messages_sent, 1);
    assert_eq!(snapshot.stats.messages_received, 1);
    assert!(session
        .transport
        .calls()
        .contains(&Call::SendText(alice(), "hi".into())));
}

#[tokio::test(start_paused = true)]
async fn test_send_text_preconditions() {
    let session = start_session();
    session.sink.peer_discovered(alice(), "Alice");

    assert_eq!(
        session.handle.send_text(alice(), "hi").await,
        Err(CommandError::PeerNotConnected { peer_id: alice() })
    );

    session.sink.peer_connected(alice(), "Alice");
    assert_eq!(
        session.handle.send_text(alice(), "   ").await,
        Err(CommandError::BlankMessage)
    );

    assert!(!session
        .transport
        .calls()
        .iter()
        .any(|c| matches!(c, Call::SendText(..))));
    let view = session.handle.conversation(alice()).await.expect("running");
    assert!(view.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_changes_no_state() {
    let transport = RecordingTransport::default();
    transport.fail("send_text", TransportError::network("connection reset"));
    let session = start_session_with(SessionConfig::new("Morgan"), transport);

    session.sink.peer_discovered(alice(), "Alice");
    session.sink.peer_connected(alice(), "Alice");

    let result = session.handle.send_text(alice(), "hi").await;
    assert_eq!(
        result,
        Err(CommandError::Transport(TransportError::network(
            "connection reset"
        )))
    );

    let snapshot = session.handle.snapshot().await.expect("running");
    assert!(snapshot.conversations.is_empty());
    assert_eq!(snapshot.stats.transport_failures, 1);
    assert!(matches!(
        snapshot.status,
        SessionStatus::TransportFailure { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_send_file_records_display_name() {
    let session = start_session();
    session.sink.peer_discovered(alice(), "Alice");
    session.sink.peer_connected(alice(), "Alice");

    session
        .handle
        .send_file(alice(), "/home/morgan/docs/plan.pdf")
        .await
        .expect("file sent");

    let view = session
        .handle
        .conversation(alice())
        .await
        .expect("running")
        .expect("conversation created");
    assert_eq!(view.messages[0].content(), "plan.pdf");
    assert_eq!(view.messages[0].kind(), MessageKind::File);

    assert!(matches!(
        session.handle.send_file(alice(), "/").await,
        Err(CommandError::InvalidFilePath { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_conversation_selection_commands() {
    let session = start_session();
    let handle = &session.handle;
    session.sink.peer_discovered(alice(), "Alice");
    session.sink.message_received("bob-2", "Bob", "hey");

    handle.start_conversation(alice()).await.expect("start");
    let snapshot = handle.snapshot().await.expect("running");
    assert_eq!(snapshot.selected, Some(alice()));
    assert_eq!(snapshot.conversations.len(), 2);

    handle.select_conversation("bob-2").await.expect("select");
    let snapshot = handle.snapshot().await.expect("running");
    assert_eq!(snapshot.selected, Some(PeerId::new("bob-2")));
    assert_eq!(snapshot.conversation(&PeerId::new("bob-2")).map(|c| c.unread_count), Some(1));

    handle.close_conversation("bob-2").await.expect("close");
    let snapshot = handle.snapshot().await.expect("running");
    // Reselects the first remaining conversation
    assert_eq!(snapshot.selected, Some(alice()));
    assert_eq!(
        handle.close_conversation("bob-2").await,
        Err(CommandError::ConversationNotFound {
            peer_id: PeerId::new("bob-2")
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_clear_conversation_keeps_it_open() {
    let session = start_session();
    session.sink.message_received(alice(), "Alice", "one");
    session.sink.message_received(alice(), "Alice", "two");

    session.handle.clear_conversation(alice()).await.expect("clear");
    let view = session
        .handle
        .conversation(alice())
        .await
        .expect("running")
        .expect("conversation kept");
    assert!(view.messages.is_empty());
    assert_eq!(view.summary.unread_count, 0);
}

// ----------------------------------------------------------------------------
// Notifications and Sweeps
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_notifications_follow_event_order() {
    let session = start_session();
    let mut changes = session.handle.subscribe();
    // Settle startup notifications
    session.handle.snapshot().await.expect("running");
    while changes.try_recv().is_ok() {}

    session.sink.peer_discovered(alice(), "Alice");
    session.sink.peer_connected(alice(), "Alice");
    session.sink.peer_discovered("carol-3", "Carol");
    session.sink.peer_connected("carol-3", "Carol");

    assert_eq!(
        next_change(&mut changes).await,
        StateChange::PeerListChanged {
            peer_id: alice(),
            kind: PeerListChangeKind::Added
        }
    );
    assert_eq!(
        next_change(&mut changes).await,
        StateChange::PeerListChanged {
            peer_id: alice(),
            kind: PeerListChangeKind::Connected
        }
    );
    assert_eq!(
        next_change(&mut changes).await,
        StateChange::FirstConnection {
            peer_id: alice(),
            peer_name: "Alice".into()
        }
    );
    assert_eq!(
        next_change(&mut changes).await,
        StateChange::PeerListChanged {
            peer_id: PeerId::new("carol-3"),
            kind: PeerListChangeKind::Added
        }
    );
    // No second milestone for Carol
    assert_eq!(
        next_change(&mut changes).await,
        StateChange::PeerListChanged {
            peer_id: PeerId::new("carol-3"),
            kind: PeerListChangeKind::Connected
        }
    );
    session.handle.snapshot().await.expect("running");
    assert!(changes.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_stale_peer_swept_with_conversation() {
    let session = start_session();
    let mut changes = session.handle.subscribe();
    let bob = PeerId::new("bob-7");

    session.sink.peer_discovered(bob.clone(), "Bob");
    session.sink.message_received(bob.clone(), "Bob", "ping");
    session.handle.start_conversation(bob.clone()).await.expect("start");

    session.clock.advance(Duration::from_secs(121));
    // Let the first cleanup tick (30s) fire
    tokio::time::sleep(Duration::from_secs(31)).await;

    let snapshot = session.handle.snapshot().await.expect("running");
    assert!(snapshot.peer(&bob).is_none());
    assert!(snapshot.conversation(&bob).is_none());
    assert_eq!(snapshot.selected, None);
    assert_eq!(
        snapshot.status,
        SessionStatus::CleanedUpPeers {
            removed: 1,
            remaining: 0
        }
    );

    let mut saw_removal = false;
    while let Ok(change) = changes.try_recv() {
        if change
            == (StateChange::ConversationChanged {
                peer_id: bob.clone(),
                kind: ConversationChangeKind::Removed,
            })
        {
            saw_removal = true;
        }
    }
    assert!(saw_removal);
}

#[tokio::test(start_paused = true)]
async fn test_connected_peer_survives_cleanup() {
    let session = start_session();
    session.sink.peer_discovered(alice(), "Alice");
    session.sink.peer_connected(alice(), "Alice");

    session.clock.advance(Duration::from_secs(600));
    tokio::time::sleep(Duration::from_secs(31)).await;

    let snapshot = session.handle.snapshot().await.expect("running");
    assert_eq!(snapshot.peer(&alice()).map(|p| p.status), Some(PeerStatus::Connected));
}

#[tokio::test(start_paused = true)]
async fn test_lagging_subscriber_does_not_block_session() {
    let mut config = SessionConfig::new("Morgan");
    config.channels.notification_buffer_size = 2;
    let session = start_session_with(config, RecordingTransport::default());
    let mut changes = session.handle.subscribe();

    for n in 0..20 {
        session.sink.peer_discovered(format!("peer-{n}"), format!("Peer {n}"));
    }

    let snapshot = session.handle.snapshot().await.expect("session not blocked");
    assert_eq!(snapshot.peers.len(), 20);
    assert!(matches!(changes.recv().await, Err(RecvError::Lagged(_))));
}
