//! Cache configuration types

use serde::{Deserialize, Serialize};
use xads_core::ConnectionManagerId;

/// Configuration for an XA connection cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PoolConfig {
    /// Whether physical connections are reused per credential
    enabled: bool,
    /// Identity handed to the enlistment adapter with every physical connection
    connection_manager: ConnectionManagerId,
}

impl PoolConfig {
    /// Create a new configuration with pooling on or off
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            connection_manager: ConnectionManagerId::default(),
        }
    }

    /// Set the connection manager identity
    pub fn with_connection_manager(mut self, name: impl Into<String>) -> Self {
        self.connection_manager = ConnectionManagerId::new(name);
        self
    }

    /// Check whether pooling is enabled
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Get the connection manager identity
    pub fn connection_manager(&self) -> &ConnectionManagerId {
        &self.connection_manager
    }
}

impl Default for PoolConfig {
    /// Pooling is off by default; every acquisition opens a new connection.
    fn default() -> Self {
        Self::new(false)
    }
}
