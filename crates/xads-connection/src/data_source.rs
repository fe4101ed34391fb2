//! Transactional data source facade
//!
//! Wraps a physical `XaDataSource` so that callers receive enlisted
//! connections, and answers a small closed set of introspection queries.

use std::fmt;
use std::sync::Arc;

use xads_core::{Credential, EnlistmentAdapter, Result, XaDataSource, XadsError};

use crate::cache::{CacheStats, ManagedConnection, PoolConfig, XaConnectionCache};

/// Views a caller may ask a `TransactionalDataSource` for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The transactional data source itself
    DataSource,
    /// The physical XA data source underneath
    XaDataSource,
    /// The reuse cache; never exposed
    ConnectionCache,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::DataSource => "data source",
            Capability::XaDataSource => "XA data source",
            Capability::ConnectionCache => "connection cache",
        };
        f.write_str(name)
    }
}

/// Result of `TransactionalDataSource::unwrap`
pub enum Unwrapped<'a> {
    DataSource(&'a TransactionalDataSource),
    XaDataSource(&'a Arc<dyn XaDataSource>),
}

impl<'a> Unwrapped<'a> {
    pub fn as_data_source(&self) -> Option<&'a TransactionalDataSource> {
        match self {
            Unwrapped::DataSource(data_source) => Some(data_source),
            Unwrapped::XaDataSource(_) => None,
        }
    }

    pub fn as_xa_data_source(&self) -> Option<&'a Arc<dyn XaDataSource>> {
        match self {
            Unwrapped::XaDataSource(xa_data_source) => Some(xa_data_source),
            Unwrapped::DataSource(_) => None,
        }
    }
}

/// A data source whose connections take part in XA transactions
pub struct TransactionalDataSource {
    xa_data_source: Arc<dyn XaDataSource>,
    cache: XaConnectionCache,
    default_credential: Credential,
}

impl TransactionalDataSource {
    /// Create a data source over a physical XA data source
    pub fn new(
        xa_data_source: Arc<dyn XaDataSource>,
        adapter: Arc<dyn EnlistmentAdapter>,
        config: PoolConfig,
    ) -> Self {
        let cache = XaConnectionCache::new(config, xa_data_source.clone(), adapter);
        Self {
            xa_data_source,
            cache,
            default_credential: Credential::none(),
        }
    }

    /// Use the given credential for `get_connection`
    pub fn with_default_credential(mut self, credential: Credential) -> Self {
        self.default_credential = credential;
        self
    }

    /// Get a connection with the default credential
    pub async fn get_connection(&self) -> Result<ManagedConnection> {
        self.cache.acquire(&self.default_credential).await
    }

    /// Get a connection as the given principal
    pub async fn get_connection_as(
        &self,
        principal: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<ManagedConnection> {
        self.cache
            .acquire(&Credential::new(principal, secret))
            .await
    }

    /// Get a connection for an explicit credential
    pub async fn get_connection_for(&self, credential: &Credential) -> Result<ManagedConnection> {
        self.cache.acquire(credential).await
    }

    /// Get the physical XA data source
    pub fn xa_data_source(&self) -> &Arc<dyn XaDataSource> {
        &self.xa_data_source
    }

    /// Check whether this data source can be viewed as the given capability
    ///
    /// Only `DataSource` is reported. The physical data source is reachable
    /// through `unwrap` but is not what this type wraps for callers.
    pub fn is_wrapper_for(&self, capability: Capability) -> bool {
        matches!(capability, Capability::DataSource)
    }

    /// View this data source as the given capability
    pub fn unwrap(&self, capability: Capability) -> Result<Unwrapped<'_>> {
        match capability {
            Capability::DataSource => Ok(Unwrapped::DataSource(self)),
            Capability::XaDataSource => Ok(Unwrapped::XaDataSource(&self.xa_data_source)),
            Capability::ConnectionCache => Err(XadsError::UnsupportedCapability(format!(
                "cannot unwrap {}",
                capability
            ))),
        }
    }

    pub fn pool_config(&self) -> &PoolConfig {
        self.cache.config()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Close every cached physical connection
    pub async fn close(&self) -> usize {
        self.cache.close_all().await
    }
}
