//! Error types for the peerchat session layer
//!
//! This module contains every error type surfaced by the session core:
//! precondition rejections from the command surface, failures reported by the
//! transport service, configuration and channel errors, and the unifying
//! `PeerchatError`.

use crate::types::PeerId;

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Failures reported synchronously by a transport service operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid transport handle")]
    InvalidHandle,
    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },
    #[error("Network error: {reason}")]
    Network { reason: String },
    #[error("Transport runtime error: {reason}")]
    Runtime { reason: String },
    #[error("Transport has not been started")]
    NotStarted,
}

impl TransportError {
    /// Create a network error
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    /// Create a runtime error
    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::Runtime {
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Command Errors
// ----------------------------------------------------------------------------

/// Rejections returned by the command surface
///
/// Precondition variants are decided locally against the current session
/// state; no transport call is made when one of them is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown peer: {peer_id}")]
    UnknownPeer { peer_id: PeerId },
    #[error("Peer {peer_id} is already connected")]
    AlreadyConnected { peer_id: PeerId },
    #[error("Peer {peer_id} is not connected")]
    PeerNotConnected { peer_id: PeerId },
    #[error("Message text is blank")]
    BlankMessage,
    #[error("Invalid file path: {path}")]
    InvalidFilePath { path: String },
    #[error("No conversation with peer {peer_id}")]
    ConversationNotFound { peer_id: PeerId },
    #[error("Transport call failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Session is closed")]
    SessionClosed,
}

impl CommandError {
    /// Whether this is a local precondition rejection
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Transport(_) | Self::SessionClosed)
    }
}

// ----------------------------------------------------------------------------
// Configuration Errors
// ----------------------------------------------------------------------------

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Failed to load configuration: {0}")]
    Loading(String),
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Unified error type for the peerchat crates
#[derive(Debug, thiserror::Error)]
pub enum PeerchatError {
    #[error("Command rejected: {0}")]
    Command(#[from] CommandError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for peerchat operations
pub type PeerchatResult<T> = core::result::Result<T, PeerchatError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(CommandError::BlankMessage.is_precondition());
        assert!(CommandError::UnknownPeer {
            peer_id: PeerId::new("x")
        }
        .is_precondition());
        assert!(!CommandError::SessionClosed.is_precondition());
        assert!(!CommandError::from(TransportError::NotStarted).is_precondition());
    }

    #[test]
    fn test_error_display() {
        let err = CommandError::PeerNotConnected {
            peer_id: PeerId::new("bob"),
        };
        assert_eq!(err.to_string(), "Peer bob is not connected");

        let err = PeerchatError::from(TransportError::network("unreachable"));
        assert_eq!(err.to_string(), "Transport error: Network error: unreachable");
    }
}
