//! Capabilities consumed from the driver and the transaction manager
//!
//! Nothing here performs two-phase commit. A driver supplies `XaDataSource`
//! and `XaConnection`, the transaction manager supplies `EnlistmentAdapter`
//! and the `EnlistedConnection` handles it produces.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Credential, Result};

/// Identity of the connection manager a wrapped connection reports to
///
/// The transaction manager uses this to route commit and rollback decisions
/// back to the right resource during recovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionManagerId(String);

impl ConnectionManagerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionManagerId {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Display for ConnectionManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical connection able to take part in a two-phase-commit transaction
#[async_trait]
pub trait XaConnection: Send + Sync {
    /// Get the driver name (e.g., "postgresql", "mysql")
    fn driver_name(&self) -> &str;

    /// Close the physical connection
    async fn close(&self) -> Result<()>;

    /// Check if the physical connection is closed
    fn is_closed(&self) -> bool;
}

/// Factory for physical XA connections
///
/// Implementations report failures as `XadsError::ConnectionAcquisitionFailed`.
#[async_trait]
pub trait XaDataSource: Send + Sync + 'static {
    /// Open a physical connection with the data source's default credentials
    async fn xa_connection(&self) -> Result<Arc<dyn XaConnection>>;

    /// Open a physical connection as the given principal
    async fn xa_connection_as(
        &self,
        principal: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Arc<dyn XaConnection>>;

    /// Open a physical connection for a credential
    ///
    /// An empty credential uses the no-credential overload.
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn XaConnection>> {
        if credential.is_empty() {
            self.xa_connection().await
        } else {
            self.xa_connection_as(credential.principal(), credential.secret())
                .await
        }
    }
}

#[async_trait]
impl<T: XaDataSource> XaDataSource for Arc<T> {
    async fn xa_connection(&self) -> Result<Arc<dyn XaConnection>> {
        (**self).xa_connection().await
    }

    async fn xa_connection_as(
        &self,
        principal: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Arc<dyn XaConnection>> {
        (**self).xa_connection_as(principal, secret).await
    }
}

/// A transaction-aware connection produced by the transaction manager
#[async_trait]
pub trait EnlistedConnection: Send + Sync {
    /// The physical connection this handle enlists
    fn xa_connection(&self) -> &Arc<dyn XaConnection>;

    /// The connection manager the handle was wrapped for
    fn connection_manager(&self) -> &ConnectionManagerId;

    /// Close the handle, releasing the physical connection
    async fn close(&self) -> Result<()> {
        self.xa_connection().close().await
    }

    /// Check if the handle is closed
    fn is_closed(&self) -> bool {
        self.xa_connection().is_closed()
    }
}

/// Transaction manager hook that turns physical connections into enlisted ones
#[async_trait]
pub trait EnlistmentAdapter: Send + Sync + 'static {
    /// Wrap a physical connection for the given connection manager
    async fn wrap(
        &self,
        xa_connection: Arc<dyn XaConnection>,
        connection_manager: &ConnectionManagerId,
    ) -> Result<Arc<dyn EnlistedConnection>>;
}

#[async_trait]
impl<T: EnlistmentAdapter> EnlistmentAdapter for Arc<T> {
    async fn wrap(
        &self,
        xa_connection: Arc<dyn XaConnection>,
        connection_manager: &ConnectionManagerId,
    ) -> Result<Arc<dyn EnlistedConnection>> {
        (**self).wrap(xa_connection, connection_manager).await
    }
}
