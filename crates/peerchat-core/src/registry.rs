//! Peer Registry
//!
//! Set of known peers keyed by [`PeerId`], with discovery/connection lifecycle
//! and a staleness sweep. Iteration order is insertion order so that peer
//! lists render stably.
//!
//! The registry filters out discoveries of the local user (matching the local
//! display name case-insensitively) so the transport's own announcements never
//! loop back as a peer.

use crate::peer::{Peer, PeerStatus};
use crate::types::{PeerId, Timestamp};
use core::time::Duration;
use std::collections::HashMap;
use tracing::debug;

/// Default staleness window for peers that are not connected
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(120);

/// Outcome of [`PeerRegistry::upsert_discovered`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerChange {
    /// A new peer entry was created
    Inserted,
    /// An existing peer was refreshed; `renamed` if its display name changed
    Refreshed { renamed: bool },
    /// The discovery matched the local user and was ignored
    SelfFiltered,
}

/// Registry of known peers
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    local_name: String,
    peers: HashMap<PeerId, Peer>,
    order: Vec<PeerId>,
}

impl PeerRegistry {
    /// Create an empty registry for the given local user name
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            peers: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Whether `name` refers to the local user
    pub fn is_self(&self, name: &str) -> bool {
        name.to_lowercase() == self.local_name.to_lowercase()
    }

    /// Insert a newly discovered peer or refresh an existing one
    ///
    /// Refreshing updates `last_seen` (and `name` if it changed) but never
    /// touches the connection status.
    pub fn upsert_discovered(&mut self, id: PeerId, name: &str, now: Timestamp) -> PeerChange {
        if self.is_self(name) {
            debug!("Ignoring self-discovery of {} ({})", id, name);
            return PeerChange::SelfFiltered;
        }

        match self.peers.get_mut(&id) {
            Some(peer) => {
                peer.last_seen = now;
                let renamed = peer.name != name;
                if renamed {
                    peer.name = name.to_string();
                }
                PeerChange::Refreshed { renamed }
            }
            None => {
                self.order.push(id.clone());
                self.peers.insert(id.clone(), Peer::discovered(id, name, now));
                PeerChange::Inserted
            }
        }
    }

    /// Mark a known peer as connected
    ///
    /// Returns `false` (and changes nothing) if the peer is unknown.
    pub fn mark_connected(&mut self, id: &PeerId, name: &str, now: Timestamp) -> bool {
        match self.peers.get_mut(id) {
            Some(peer) => {
                peer.status = PeerStatus::Connected;
                peer.last_seen = now;
                true
            }
            None => {
                debug!("Connection event for unknown peer {} ({}), ignoring", id, name);
                false
            }
        }
    }

    /// Mark a known peer as disconnected
    ///
    /// Returns `false` if the peer is unknown.
    pub fn mark_disconnected(&mut self, id: &PeerId) -> bool {
        match self.peers.get_mut(id) {
            Some(peer) => {
                peer.status = PeerStatus::Disconnected;
                true
            }
            None => false,
        }
    }

    /// Remove every non-connected peer unseen for longer than `stale_after`
    ///
    /// Returns the removed ids in insertion order.
    pub fn sweep_stale(&mut self, now: Timestamp, stale_after: Duration) -> Vec<PeerId> {
        let peers = &self.peers;
        let (stale, kept): (Vec<PeerId>, Vec<PeerId>) =
            self.order.drain(..).partition(|id| {
                peers
                    .get(id)
                    .map(|peer| peer.is_stale(now, stale_after))
                    .unwrap_or(true)
            });
        self.order = kept;

        for id in &stale {
            self.peers.remove(id);
        }
        stale
    }

    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Owned snapshot of all peers in insertion order
    pub fn all(&self) -> Vec<Peer> {
        self.order
            .iter()
            .filter_map(|id| self.peers.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.peers.values().filter(|p| p.is_connected()).count()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PeerId {
        PeerId::new(s)
    }

    #[test]
    fn test_upsert_inserts_then_refreshes() {
        let mut registry = PeerRegistry::new("Me");

        let change = registry.upsert_discovered(id("a"), "Alice", Timestamp::new(1));
        assert_eq!(change, PeerChange::Inserted);

        let change = registry.upsert_discovered(id("a"), "Alice", Timestamp::new(5));
        assert_eq!(change, PeerChange::Refreshed { renamed: false });

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id("a")).map(|p| p.last_seen), Some(Timestamp::new(5)));
    }

    #[test]
    fn test_refresh_renames_without_touching_status() {
        let mut registry = PeerRegistry::new("Me");
        registry.upsert_discovered(id("a"), "Alice", Timestamp::new(1));
        registry.mark_connected(&id("a"), "Alice", Timestamp::new(2));

        let change = registry.upsert_discovered(id("a"), "Alicia", Timestamp::new(3));
        assert_eq!(change, PeerChange::Refreshed { renamed: true });

        let peer = registry.get(&id("a")).expect("peer exists");
        assert_eq!(peer.name, "Alicia");
        assert_eq!(peer.status, PeerStatus::Connected);
    }

    #[test]
    fn test_self_discovery_is_filtered_case_insensitively() {
        let mut registry = PeerRegistry::new("Morgan");

        let change = registry.upsert_discovered(id("self"), "mORGAN", Timestamp::new(1));
        assert_eq!(change, PeerChange::SelfFiltered);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_peer_lifecycle_events_are_noops() {
        let mut registry = PeerRegistry::new("Me");
        assert!(!registry.mark_connected(&id("ghost"), "Ghost", Timestamp::new(1)));
        assert!(!registry.mark_disconnected(&id("ghost")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_keeps_connected_and_fresh_peers() {
        let mut registry = PeerRegistry::new("Me");
        registry.upsert_discovered(id("old"), "Old", Timestamp::new(0));
        registry.upsert_discovered(id("conn"), "Conn", Timestamp::new(0));
        registry.mark_connected(&id("conn"), "Conn", Timestamp::new(0));
        registry.upsert_discovered(id("fresh"), "Fresh", Timestamp::new(100_000));

        let removed = registry.sweep_stale(Timestamp::new(200_000), DEFAULT_STALE_AFTER);

        assert_eq!(removed, vec![id("old")]);
        let remaining: Vec<PeerId> = registry.all().into_iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec![id("conn"), id("fresh")]);
    }

    #[test]
    fn test_disconnected_peer_becomes_sweepable() {
        let mut registry = PeerRegistry::new("Me");
        registry.upsert_discovered(id("a"), "A", Timestamp::new(0));
        registry.mark_connected(&id("a"), "A", Timestamp::new(0));
        registry.mark_disconnected(&id("a"));

        let removed = registry.sweep_stale(Timestamp::new(121_000), DEFAULT_STALE_AFTER);
        assert_eq!(removed, vec![id("a")]);
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut registry = PeerRegistry::new("Me");
        for name in ["c", "a", "b"] {
            registry.upsert_discovered(id(name), name, Timestamp::new(0));
        }
        registry.upsert_discovered(id("a"), "a", Timestamp::new(10));

        let order: Vec<String> = registry.all().into_iter().map(|p| p.name).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(registry.connected_count(), 0);
    }
}
