//! Peer records
//!
//! Describes a remote participant as tracked by the [`crate::PeerRegistry`].

use crate::types::{PeerId, Timestamp};
use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Connection lifecycle of a peer (tracks connection, not existence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerStatus {
    Discovered,
    Connected,
    Disconnected,
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerStatus::Discovered => write!(f, "Discovered"),
            PeerStatus::Connected => write!(f, "Connected"),
            PeerStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Coarse age of a peer's last sighting, for "last seen" labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastSeen {
    JustNow,
    MinutesAgo(u64),
    HoursAgo(u64),
    DaysAgo(u64),
}

impl LastSeen {
    /// Classify an elapsed duration
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let minutes = elapsed.as_secs() / 60;
        if minutes < 1 {
            LastSeen::JustNow
        } else if minutes < 60 {
            LastSeen::MinutesAgo(minutes)
        } else if minutes < 24 * 60 {
            LastSeen::HoursAgo(minutes / 60)
        } else {
            LastSeen::DaysAgo(minutes / (24 * 60))
        }
    }
}

impl fmt::Display for LastSeen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastSeen::JustNow => write!(f, "just now"),
            LastSeen::MinutesAgo(n) => write!(f, "{n} min ago"),
            LastSeen::HoursAgo(n) => write!(f, "{n} h ago"),
            LastSeen::DaysAgo(n) => write!(f, "{n} d ago"),
        }
    }
}

/// A known remote peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub name: String,
    pub status: PeerStatus,
    pub last_seen: Timestamp,
}

impl Peer {
    /// Freshly discovered peer
    pub fn discovered(id: PeerId, name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            status: PeerStatus::Discovered,
            last_seen: now,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == PeerStatus::Connected
    }

    /// Not connected and unseen for longer than `stale_after`
    pub fn is_stale(&self, now: Timestamp, stale_after: Duration) -> bool {
        !self.is_connected() && now.duration_since(self.last_seen) > stale_after
    }

    pub fn last_seen_age(&self, now: Timestamp) -> LastSeen {
        LastSeen::from_elapsed(now.duration_since(self.last_seen))
    }
}
