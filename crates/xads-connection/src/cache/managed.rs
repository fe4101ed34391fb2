//! Connection handles returned by the cache

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use xads_core::{ConnectionManagerId, EnlistedConnection, Result, XaConnection};

/// What happens to the physical connection when a handle is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Leave the physical connection open in the cache
    Retain,
    /// Close the physical connection
    Close,
}

/// A connection handed out by `XaConnectionCache`
///
/// Dropping a handle without closing it does not touch the physical
/// connection.
pub struct ManagedConnection {
    enlisted: Arc<dyn EnlistedConnection>,
    release: ReleaseMode,
    closed: AtomicBool,
}

impl ManagedConnection {
    pub(crate) fn new(enlisted: Arc<dyn EnlistedConnection>, release: ReleaseMode) -> Self {
        Self {
            enlisted,
            release,
            closed: AtomicBool::new(false),
        }
    }

    /// Get the transaction-aware handle produced by the enlistment adapter
    pub fn enlisted(&self) -> &Arc<dyn EnlistedConnection> {
        &self.enlisted
    }

    /// Get the physical connection underneath
    pub fn xa_connection(&self) -> &Arc<dyn XaConnection> {
        self.enlisted.xa_connection()
    }

    pub fn connection_manager(&self) -> &ConnectionManagerId {
        self.enlisted.connection_manager()
    }

    pub fn release_mode(&self) -> ReleaseMode {
        self.release
    }

    /// Check whether two handles share the same enlisted connection
    pub fn is_same_connection(&self, other: &ManagedConnection) -> bool {
        Arc::ptr_eq(&self.enlisted, &other.enlisted)
    }

    /// Close this handle
    ///
    /// In `Retain` mode only the handle is marked closed and the physical
    /// connection stays cached. In `Close` mode the enlisted connection is
    /// closed, which releases the physical connection. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match self.release {
            ReleaseMode::Retain => {
                tracing::trace!(
                    connection_manager = %self.connection_manager(),
                    "handle closed, physical connection retained"
                );
                Ok(())
            }
            ReleaseMode::Close => self.enlisted.close().await,
        }
    }

    /// Check whether this handle has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.enlisted.is_closed()
    }
}

impl fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("driver", &self.xa_connection().driver_name())
            .field("connection_manager", self.connection_manager())
            .field("release", &self.release)
            .field("closed", &self.is_closed())
            .finish()
    }
}
