//! Session Configuration
//!
//! Tunables for the session layer: history bound, staleness window, timer
//! periods and channel buffer sizes. Every struct deserializes with defaults
//! for missing fields so partial TOML files are accepted.

use crate::errors::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use core::time::Duration;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizes for the session channels
///
/// The transport event mailbox is unbounded so that transport callbacks never
/// block; only the command and notification channels are sized here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Buffer size for the command channel (UI → Session)
    pub command_buffer_size: usize,
    /// Capacity of the notification broadcast (Session → UI)
    pub notification_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,        // UI commands are infrequent
            notification_buffer_size: 256, // bursts of discovery refreshes
        }
    }
}

impl ChannelConfig {
    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            command_buffer_size: 100,
            notification_buffer_size: 1024,
        }
    }
}

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Configuration for one chat session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Display name of the local user; discoveries with this name are ignored
    pub local_name: String,
    /// Messages retained per conversation
    pub history_capacity: usize,
    /// Seconds after which a non-connected peer is swept
    pub stale_after_secs: u64,
    /// Period of the discovery tick
    pub discovery_interval_secs: u64,
    /// Period of the cleanup tick
    pub cleanup_interval_secs: u64,
    /// Channel sizing
    pub channels: ChannelConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_name: "me".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            stale_after_secs: 120,
            discovery_interval_secs: 5,
            cleanup_interval_secs: 30,
            channels: ChannelConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Default configuration for the given local user
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            ..Self::default()
        }
    }

    /// Builder method for overriding the history bound
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Builder method for customizing channel configuration
    pub fn with_channels(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Validate the configuration for consistency and feasibility
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_name.trim().is_empty() {
            return Err(invalid("local_name", "cannot be blank"));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", "cannot be zero"));
        }
        if self.stale_after_secs == 0 {
            return Err(invalid("stale_after_secs", "cannot be zero"));
        }
        // tokio intervals panic on a zero period
        if self.discovery_interval_secs == 0 {
            return Err(invalid("discovery_interval_secs", "cannot be zero"));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(invalid("cleanup_interval_secs", "cannot be zero"));
        }
        if self.channels.command_buffer_size == 0 {
            return Err(invalid("channels.command_buffer_size", "cannot be zero"));
        }
        if self.channels.notification_buffer_size == 0 {
            return Err(invalid("channels.notification_buffer_size", "cannot be zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
