//! Transaction manager properties
//!
//! A `TransactionProperties` value is the configuration snapshot that
//! `PropertiesInitializer` applies to a `TransactionEnvironment`. It is
//! usually loaded once at startup from a TOML file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use xads_connection::{PoolConfig, TransactionalDataSource};
use xads_core::{Credential, EnlistmentAdapter, Result, XaDataSource, XadsError};

use crate::node_identifier::ShorteningAlgorithm;

/// Default transaction isolation level applied to new connections
///
/// Values map to the conventional JDBC integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
}

impl IsolationLevel {
    /// Integer code understood by the transactional driver
    pub fn level(&self) -> i32 {
        match self {
            IsolationLevel::None => 0,
            IsolationLevel::ReadUncommitted => 1,
            IsolationLevel::ReadCommitted => 2,
            IsolationLevel::RepeatableRead => 4,
            IsolationLevel::Serializable => 8,
        }
    }
}

/// Settings for the transactional JDBC-style driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransactionalDriverProperties {
    /// Connection reuse settings
    pub pool: PoolConfig,
    pub default_isolation_level: IsolationLevel,
    /// Treat all resources as the same resource manager unless told otherwise
    pub default_is_same_rm_override: bool,
    /// Credential used when callers do not supply one
    pub recovery_credential: Option<Credential>,
}

impl TransactionalDriverProperties {
    /// Credential for connections requested without explicit credentials
    pub fn default_credential(&self) -> Credential {
        self.recovery_credential.clone().unwrap_or_default()
    }

    /// Build a transactional data source using these pool and credential settings
    pub fn data_source(
        &self,
        xa_data_source: Arc<dyn XaDataSource>,
        adapter: Arc<dyn EnlistmentAdapter>,
    ) -> TransactionalDataSource {
        TransactionalDataSource::new(xa_data_source, adapter, self.pool.clone())
            .with_default_credential(self.default_credential())
    }
}

/// Configuration snapshot for the transaction manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransactionProperties {
    /// Unique identifier of this transaction manager instance
    pub node_identifier: Option<String>,
    /// Replace identifiers longer than 28 bytes with a digest-derived token
    pub shorten_node_identifier_if_necessary: bool,
    /// Digest used when shortening the node identifier
    pub node_identifier_digest: String,
    /// Nodes whose transactions this instance recovers; defaults to itself
    pub xa_recovery_nodes: Vec<String>,
    /// Transaction log directory; the store default is kept when unset
    pub log_dir: Option<PathBuf>,
    pub one_phase_commit: bool,
    /// Default transaction timeout in seconds
    pub default_timeout: i64,
    /// Seconds between recovery passes
    pub periodic_recovery_period: i64,
    /// Seconds between the two phases of a recovery pass
    pub recovery_backoff_period: i64,
    /// Hours between expiry scans; negative runs the first scan at startup
    pub expiry_scan_interval: i64,
    pub xa_resource_orphan_filters: Vec<String>,
    pub xa_resource_record_wrapping_plugin: Option<String>,
    pub last_resource_optimisation_interface: Option<String>,
    pub commit_markable_resource_names: Vec<String>,
    pub recovery_modules: Vec<String>,
    pub expiry_scanners: Vec<String>,
    pub transactional_driver: TransactionalDriverProperties,
}

impl Default for TransactionProperties {
    fn default() -> Self {
        Self {
            node_identifier: Some("1".to_string()),
            shorten_node_identifier_if_necessary: false,
            node_identifier_digest: ShorteningAlgorithm::default().name().to_string(),
            xa_recovery_nodes: Vec::new(),
            log_dir: None,
            one_phase_commit: true,
            default_timeout: 60,
            periodic_recovery_period: 120,
            recovery_backoff_period: 10,
            expiry_scan_interval: 12,
            xa_resource_orphan_filters: vec![
                "transaction-log".to_string(),
                "node-name".to_string(),
                "action-status".to_string(),
            ],
            xa_resource_record_wrapping_plugin: None,
            last_resource_optimisation_interface: None,
            commit_markable_resource_names: Vec::new(),
            recovery_modules: vec!["atomic-action".to_string(), "xa".to_string()],
            expiry_scanners: vec!["expired-transaction-status-manager".to_string()],
            transactional_driver: TransactionalDriverProperties::default(),
        }
    }
}

impl TransactionProperties {
    /// Parse properties from TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| XadsError::InvalidConfiguration(format!("failed to parse properties: {}", e)))
    }

    /// Load properties from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let properties = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "transaction properties loaded");
        Ok(properties)
    }

    /// Check every field without applying anything
    pub fn validate(&self) -> Result<()> {
        if let Some(node_identifier) = &self.node_identifier
            && node_identifier.trim().is_empty()
        {
            return Err(XadsError::InvalidConfiguration(
                "node-identifier must not be blank".into(),
            ));
        }

        if self.shorten_node_identifier_if_necessary {
            self.node_identifier_digest.parse::<ShorteningAlgorithm>()?;
        }

        non_negative("default-timeout", self.default_timeout)?;
        non_negative("periodic-recovery-period", self.periodic_recovery_period)?;
        non_negative("recovery-backoff-period", self.recovery_backoff_period)?;

        no_blank_entries("xa-recovery-nodes", &self.xa_recovery_nodes)?;
        no_blank_entries("xa-resource-orphan-filters", &self.xa_resource_orphan_filters)?;
        no_blank_entries("commit-markable-resource-names", &self.commit_markable_resource_names)?;
        no_blank_entries("recovery-modules", &self.recovery_modules)?;
        no_blank_entries("expiry-scanners", &self.expiry_scanners)?;

        Ok(())
    }
}

/// Convert a seconds value, rejecting negatives
pub(crate) fn non_negative(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        XadsError::InvalidConfiguration(format!("{} must not be negative, got {}", field, value))
    })
}

fn no_blank_entries(field: &str, values: &[String]) -> Result<()> {
    match values.iter().position(|value| value.trim().is_empty()) {
        Some(index) => Err(XadsError::InvalidConfiguration(format!(
            "{} contains a blank entry at index {}",
            field, index
        ))),
        None => Ok(()),
    }
}
