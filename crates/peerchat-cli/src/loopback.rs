//! Loopback Transport
//!
//! An in-process [`Transport`] backed by a configured list of simulated
//! peers. Discovery announces every simulated peer, connections always
//! succeed for known peers, and connected peers can echo what they receive.
//! It lets the CLI drive a full session without a network.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use peerchat_core::{ConfigError, PeerId, TransportError};
use peerchat_runtime::{Transport, TransportEventSink};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Simulated network for the loopback transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Address reported once started
    pub address: String,
    /// Display names of the simulated peers
    pub peers: Vec<String>,
    /// Whether connected peers echo incoming messages and files
    pub echo: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            address: "loopback:7777".to_string(),
            peers: vec!["alice".to_string(), "bob".to_string()],
            echo: true,
        }
    }
}

impl LoopbackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peers.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "loopback.peers",
                reason: "peer names cannot be blank".to_string(),
            });
        }
        Ok(())
    }
}

/// Peer id used for a simulated peer name
pub fn loopback_peer_id(name: &str) -> PeerId {
    PeerId::new(name.trim().to_lowercase())
}

// ----------------------------------------------------------------------------
// Loopback Transport
// ----------------------------------------------------------------------------

pub struct LoopbackTransport {
    config: LoopbackConfig,
    sink: TransportEventSink,
    started: bool,
    connected: HashSet<PeerId>,
}

impl LoopbackTransport {
    pub fn new(config: LoopbackConfig, sink: TransportEventSink) -> Self {
        Self {
            config,
            sink,
            started: false,
            connected: HashSet::new(),
        }
    }

    fn ensure_started(&self) -> Result<(), TransportError> {
        if self.started {
            Ok(())
        } else {
            Err(TransportError::NotStarted)
        }
    }

    fn simulated_name(&self, peer_id: &PeerId) -> Option<&str> {
        self.config
            .peers
            .iter()
            .find(|name| loopback_peer_id(name) == *peer_id)
            .map(String::as_str)
    }

    /// Name of a connected simulated peer
    fn connected_name(&self, peer_id: &PeerId) -> Result<String, TransportError> {
        self.ensure_started()?;
        match self.simulated_name(peer_id) {
            Some(name) if self.connected.contains(peer_id) => Ok(name.to_string()),
            _ => Err(TransportError::network(format!("no connection to {}", peer_id))),
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn start(&mut self) -> Result<(), TransportError> {
        info!(
            "Loopback transport simulating {} peers",
            self.config.peers.len()
        );
        self.started = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        for peer_id in self.connected.drain() {
            debug!("Dropping loopback connection to {}", peer_id);
        }
        self.started = false;
        Ok(())
    }

    async fn discover_peers(&mut self) -> Result<(), TransportError> {
        self.ensure_started()?;
        for name in &self.config.peers {
            self.sink.peer_discovered(loopback_peer_id(name), name.as_str());
        }
        Ok(())
    }

    async fn connect_to_peer(&mut self, peer_id: &PeerId) -> Result<(), TransportError> {
        self.ensure_started()?;
        let name = self
            .simulated_name(peer_id)
            .map(str::to_string)
            .ok_or_else(|| TransportError::network(format!("{} is unreachable", peer_id)))?;

        self.connected.insert(peer_id.clone());
        self.sink.peer_connected(peer_id.clone(), name);
        Ok(())
    }

    async fn send_text(&mut self, peer_id: &PeerId, text: &str) -> Result<(), TransportError> {
        let name = self.connected_name(peer_id)?;
        if self.config.echo {
            self.sink
                .message_received(peer_id.clone(), name, format!("echo: {}", text));
        }
        Ok(())
    }

    async fn send_file(&mut self, peer_id: &PeerId, path: &Path) -> Result<(), TransportError> {
        let name = self.connected_name(peer_id)?;
        tokio::fs::metadata(path)
            .await
            .map_err(|e| TransportError::InvalidParameter {
                reason: format!("cannot read {}: {}", path.display(), e),
            })?;

        if self.config.echo {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.sink.file_received(
                peer_id.clone(),
                name,
                file_name,
                path.display().to_string(),
            );
        }
        Ok(())
    }

    fn local_address(&self) -> Option<String> {
        self.started.then(|| self.config.address.clone())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
