//! Resolved transaction manager environment
//!
//! One owned value per process, built at startup and handed by reference to
//! whatever needs it. Each sub-environment mirrors one subsystem of the
//! transaction manager: identity, coordinator, recovery, JTA, object stores
//! and the transactional JDBC driver.

use std::path::{Path, PathBuf};

use serde::Serialize;
use xads_core::{Result, XadsError};

use crate::node_identifier::MAX_NODE_IDENTIFIER_BYTES;

/// Directory used by the object stores when no log directory is configured
pub const DEFAULT_OBJECT_STORE_DIR: &str = "ObjectStore";

/// Identity of this transaction manager instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoreEnvironment {
    node_identifier: Option<String>,
}

impl CoreEnvironment {
    pub fn node_identifier(&self) -> Option<&str> {
        self.node_identifier.as_deref()
    }

    /// Set the node identifier
    ///
    /// Identifiers longer than 28 bytes of UTF-8 are rejected.
    pub fn set_node_identifier(&mut self, node_identifier: Option<String>) -> Result<()> {
        if let Some(id) = &node_identifier
            && id.len() > MAX_NODE_IDENTIFIER_BYTES
        {
            return Err(XadsError::InvalidConfiguration(format!(
                "node identifier '{}' is {} bytes, the limit is {}",
                id,
                id.len(),
                MAX_NODE_IDENTIFIER_BYTES
            )));
        }
        self.node_identifier = node_identifier;
        Ok(())
    }
}

/// Transaction coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorEnvironment {
    commit_one_phase: bool,
    default_timeout: u64,
}

impl Default for CoordinatorEnvironment {
    fn default() -> Self {
        Self {
            commit_one_phase: true,
            default_timeout: 60,
        }
    }
}

impl CoordinatorEnvironment {
    pub fn commit_one_phase(&self) -> bool {
        self.commit_one_phase
    }

    pub fn set_commit_one_phase(&mut self, commit_one_phase: bool) {
        self.commit_one_phase = commit_one_phase;
    }

    /// Default transaction timeout in seconds
    pub fn default_timeout(&self) -> u64 {
        self.default_timeout
    }

    pub fn set_default_timeout(&mut self, seconds: u64) {
        self.default_timeout = seconds;
    }
}

/// Recovery manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryEnvironment {
    periodic_recovery_period: u64,
    recovery_backoff_period: u64,
    expiry_scan_interval: i64,
    recovery_modules: Vec<String>,
    expiry_scanners: Vec<String>,
}

impl Default for RecoveryEnvironment {
    fn default() -> Self {
        Self {
            periodic_recovery_period: 120,
            recovery_backoff_period: 10,
            expiry_scan_interval: 12,
            recovery_modules: Vec::new(),
            expiry_scanners: Vec::new(),
        }
    }
}

impl RecoveryEnvironment {
    pub fn periodic_recovery_period(&self) -> u64 {
        self.periodic_recovery_period
    }

    pub fn set_periodic_recovery_period(&mut self, seconds: u64) {
        self.periodic_recovery_period = seconds;
    }

    pub fn recovery_backoff_period(&self) -> u64 {
        self.recovery_backoff_period
    }

    pub fn set_recovery_backoff_period(&mut self, seconds: u64) {
        self.recovery_backoff_period = seconds;
    }

    pub fn expiry_scan_interval(&self) -> i64 {
        self.expiry_scan_interval
    }

    pub fn set_expiry_scan_interval(&mut self, hours: i64) {
        self.expiry_scan_interval = hours;
    }

    pub fn recovery_modules(&self) -> &[String] {
        &self.recovery_modules
    }

    pub fn set_recovery_modules(&mut self, modules: Vec<String>) {
        self.recovery_modules = modules;
    }

    pub fn expiry_scanners(&self) -> &[String] {
        &self.expiry_scanners
    }

    pub fn set_expiry_scanners(&mut self, scanners: Vec<String>) {
        self.expiry_scanners = scanners;
    }
}

/// XA resource handling settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JtaEnvironment {
    xa_recovery_nodes: Vec<String>,
    orphan_filters: Vec<String>,
    record_wrapping_plugin: Option<String>,
    last_resource_optimisation_interface: Option<String>,
    commit_markable_resource_names: Vec<String>,
}

impl JtaEnvironment {
    pub fn xa_recovery_nodes(&self) -> &[String] {
        &self.xa_recovery_nodes
    }

    pub fn set_xa_recovery_nodes(&mut self, nodes: Vec<String>) {
        self.xa_recovery_nodes = nodes;
    }

    pub fn orphan_filters(&self) -> &[String] {
        &self.orphan_filters
    }

    pub fn set_orphan_filters(&mut self, filters: Vec<String>) {
        self.orphan_filters = filters;
    }

    pub fn record_wrapping_plugin(&self) -> Option<&str> {
        self.record_wrapping_plugin.as_deref()
    }

    pub fn set_record_wrapping_plugin(&mut self, plugin: Option<String>) {
        self.record_wrapping_plugin = plugin;
    }

    pub fn last_resource_optimisation_interface(&self) -> Option<&str> {
        self.last_resource_optimisation_interface.as_deref()
    }

    pub fn set_last_resource_optimisation_interface(&mut self, interface: Option<String>) {
        self.last_resource_optimisation_interface = interface;
    }

    pub fn commit_markable_resource_names(&self) -> &[String] {
        &self.commit_markable_resource_names
    }

    pub fn set_commit_markable_resource_names(&mut self, names: Vec<String>) {
        self.commit_markable_resource_names = names;
    }
}

/// Named object store instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// Transaction log store
    Default,
    /// Store for inter-process communication records
    Communication,
    /// Store for participant state
    State,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Default, StoreKind::Communication, StoreKind::State];
}

/// Location of one object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectStoreEnvironment {
    object_store_dir: PathBuf,
}

impl Default for ObjectStoreEnvironment {
    fn default() -> Self {
        Self {
            object_store_dir: PathBuf::from(DEFAULT_OBJECT_STORE_DIR),
        }
    }
}

impl ObjectStoreEnvironment {
    pub fn object_store_dir(&self) -> &Path {
        &self.object_store_dir
    }

    pub fn set_object_store_dir(&mut self, dir: impl Into<PathBuf>) {
        self.object_store_dir = dir.into();
    }
}

/// Defaults for the transactional JDBC-style driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JdbcEnvironment {
    isolation_level: i32,
    default_is_same_rm_override: bool,
}

impl Default for JdbcEnvironment {
    fn default() -> Self {
        Self {
            isolation_level: 8,
            default_is_same_rm_override: false,
        }
    }
}

impl JdbcEnvironment {
    pub fn isolation_level(&self) -> i32 {
        self.isolation_level
    }

    pub fn set_isolation_level(&mut self, level: i32) {
        self.isolation_level = level;
    }

    pub fn default_is_same_rm_override(&self) -> bool {
        self.default_is_same_rm_override
    }

    pub fn set_default_is_same_rm_override(&mut self, same_rm: bool) {
        self.default_is_same_rm_override = same_rm;
    }
}

/// All transaction manager subsystems
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionEnvironment {
    core: CoreEnvironment,
    coordinator: CoordinatorEnvironment,
    recovery: RecoveryEnvironment,
    jta: JtaEnvironment,
    object_store: ObjectStoreEnvironment,
    communication_store: ObjectStoreEnvironment,
    state_store: ObjectStoreEnvironment,
    jdbc: JdbcEnvironment,
}

impl TransactionEnvironment {
    pub fn core(&self) -> &CoreEnvironment {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut CoreEnvironment {
        &mut self.core
    }

    pub fn coordinator(&self) -> &CoordinatorEnvironment {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut CoordinatorEnvironment {
        &mut self.coordinator
    }

    pub fn recovery(&self) -> &RecoveryEnvironment {
        &self.recovery
    }

    pub fn recovery_mut(&mut self) -> &mut RecoveryEnvironment {
        &mut self.recovery
    }

    pub fn jta(&self) -> &JtaEnvironment {
        &self.jta
    }

    pub fn jta_mut(&mut self) -> &mut JtaEnvironment {
        &mut self.jta
    }

    pub fn jdbc(&self) -> &JdbcEnvironment {
        &self.jdbc
    }

    pub fn jdbc_mut(&mut self) -> &mut JdbcEnvironment {
        &mut self.jdbc
    }

    /// Get one of the named object stores
    pub fn object_store(&self, kind: StoreKind) -> &ObjectStoreEnvironment {
        match kind {
            StoreKind::Default => &self.object_store,
            StoreKind::Communication => &self.communication_store,
            StoreKind::State => &self.state_store,
        }
    }

    pub fn object_store_mut(&mut self, kind: StoreKind) -> &mut ObjectStoreEnvironment {
        match kind {
            StoreKind::Default => &mut self.object_store,
            StoreKind::Communication => &mut self.communication_store,
            StoreKind::State => &mut self.state_store,
        }
    }
}

#[cfg(test)]
mod tests;
