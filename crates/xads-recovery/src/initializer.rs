//! Applies `TransactionProperties` to a `TransactionEnvironment`
//!
//! The node identifier is resolved first because the recovery node list
//! defaults to it. Every other field is independent. The first invalid value
//! aborts the remaining assignments; this runs once at startup and is not
//! transactional.

use std::path::Path;

use xads_core::{Result, XadsError};

use crate::environment::{StoreKind, TransactionEnvironment};
use crate::node_identifier::{IdentifierNormalizer, MAX_NODE_IDENTIFIER_BYTES};
use crate::properties::{TransactionProperties, non_negative};

/// Pushes a properties snapshot into the transaction manager subsystems
pub struct PropertiesInitializer<'a> {
    properties: &'a TransactionProperties,
}

impl<'a> PropertiesInitializer<'a> {
    pub fn new(properties: &'a TransactionProperties) -> Self {
        Self { properties }
    }

    /// Apply every property to the environment
    ///
    /// Calling this again re-applies all fields. It must not run while
    /// connections are being acquired.
    #[tracing::instrument(skip_all, fields(node_identifier = ?self.properties.node_identifier))]
    pub fn apply(&self, environment: &mut TransactionEnvironment) -> Result<()> {
        let properties = self.properties;

        self.set_node_identifier(environment)?;
        self.set_xa_recovery_nodes(environment)?;
        self.set_object_store_dir(environment, properties.log_dir.as_deref());

        let coordinator = environment.coordinator_mut();
        coordinator.set_commit_one_phase(properties.one_phase_commit);
        coordinator.set_default_timeout(non_negative("default-timeout", properties.default_timeout)?);

        let recovery = environment.recovery_mut();
        recovery.set_periodic_recovery_period(non_negative(
            "periodic-recovery-period",
            properties.periodic_recovery_period,
        )?);
        recovery.set_recovery_backoff_period(non_negative(
            "recovery-backoff-period",
            properties.recovery_backoff_period,
        )?);
        recovery.set_expiry_scan_interval(properties.expiry_scan_interval);

        let jta = environment.jta_mut();
        jta.set_orphan_filters(properties.xa_resource_orphan_filters.clone());
        jta.set_record_wrapping_plugin(properties.xa_resource_record_wrapping_plugin.clone());
        jta.set_last_resource_optimisation_interface(
            properties.last_resource_optimisation_interface.clone(),
        );
        jta.set_commit_markable_resource_names(properties.commit_markable_resource_names.clone());

        let recovery = environment.recovery_mut();
        recovery.set_recovery_modules(properties.recovery_modules.clone());
        recovery.set_expiry_scanners(properties.expiry_scanners.clone());

        let driver = &properties.transactional_driver;
        let jdbc = environment.jdbc_mut();
        jdbc.set_isolation_level(driver.default_isolation_level.level());
        jdbc.set_default_is_same_rm_override(driver.default_is_same_rm_override);

        tracing::info!(
            node_identifier = environment.core().node_identifier().unwrap_or("<unset>"),
            recovery_nodes = environment.jta().xa_recovery_nodes().len(),
            "transaction environment configured"
        );
        Ok(())
    }

    fn set_node_identifier(&self, environment: &mut TransactionEnvironment) -> Result<()> {
        let normalizer = IdentifierNormalizer::new(self.properties.node_identifier_digest.as_str());
        let node_identifier = self
            .properties
            .node_identifier
            .as_deref()
            .map(|id| {
                normalizer.normalize(
                    id,
                    MAX_NODE_IDENTIFIER_BYTES,
                    self.properties.shorten_node_identifier_if_necessary,
                )
            })
            .transpose()?
            .map(|id| id.into_owned());

        environment.core_mut().set_node_identifier(node_identifier)
    }

    /// An empty list defaults to the node identifier resolved just before
    fn set_xa_recovery_nodes(&self, environment: &mut TransactionEnvironment) -> Result<()> {
        let nodes = if self.properties.xa_recovery_nodes.is_empty() {
            let node_identifier = environment.core().node_identifier().ok_or_else(|| {
                XadsError::InvalidConfiguration(
                    "xa-recovery-nodes is empty and no node identifier is set".into(),
                )
            })?;
            vec![node_identifier.to_string()]
        } else {
            self.properties.xa_recovery_nodes.clone()
        };

        tracing::debug!(nodes = ?nodes, "recovery nodes resolved");
        environment.jta_mut().set_xa_recovery_nodes(nodes);
        Ok(())
    }

    /// Without a log directory the stores keep their default location
    fn set_object_store_dir(&self, environment: &mut TransactionEnvironment, dir: Option<&Path>) {
        let Some(dir) = dir else {
            return;
        };
        for kind in StoreKind::ALL {
            environment.object_store_mut(kind).set_object_store_dir(dir);
        }
    }
}

/// Apply properties to an environment
pub fn apply_configuration(
    properties: &TransactionProperties,
    environment: &mut TransactionEnvironment,
) -> Result<()> {
    PropertiesInitializer::new(properties).apply(environment)
}

impl TransactionEnvironment {
    /// Build an environment from defaults plus the given properties
    pub fn from_properties(properties: &TransactionProperties) -> Result<Self> {
        let mut environment = Self::default();
        apply_configuration(properties, &mut environment)?;
        Ok(environment)
    }
}
