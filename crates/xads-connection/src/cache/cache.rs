//! XA connection cache implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use xads_core::{Credential, EnlistedConnection, EnlistmentAdapter, Result, XaDataSource};

use super::config::PoolConfig;
use super::managed::{ManagedConnection, ReleaseMode};
use super::stats::CacheStats;

/// A cached physical connection and the enlisted handle wrapping it
struct PooledEntry {
    enlisted: Arc<dyn EnlistedConnection>,
    created_at: Instant,
}

impl PooledEntry {
    fn new(enlisted: Arc<dyn EnlistedConnection>) -> Self {
        Self {
            enlisted,
            created_at: Instant::now(),
        }
    }

    /// A closed physical connection is never handed out again
    fn is_usable(&self) -> bool {
        !self.enlisted.xa_connection().is_closed()
    }

    async fn close(self) -> Result<()> {
        self.enlisted.xa_connection().close().await
    }
}

/// Per-credential slot. `None` means no entry exists for the credential.
///
/// The async mutex is held across connection creation so concurrent
/// acquisitions for a new credential open exactly one physical connection.
type EntrySlot = tokio::sync::Mutex<Option<PooledEntry>>;

/// Hands out enlisted XA connections, reusing one physical connection per
/// credential when pooling is enabled
pub struct XaConnectionCache {
    /// Cache configuration
    config: PoolConfig,
    /// Physical connection factory
    data_source: Arc<dyn XaDataSource>,
    /// Transaction manager hook
    adapter: Arc<dyn EnlistmentAdapter>,
    /// Slots keyed by credential
    slots: Mutex<HashMap<Credential, Arc<EntrySlot>>>,
    /// Number of populated slots
    entry_count: AtomicUsize,
    /// Physical connections opened so far
    opened_count: AtomicUsize,
    /// Acquisitions served from a cached entry
    reused_count: AtomicUsize,
}

impl XaConnectionCache {
    /// Create a new cache over the given data source and enlistment adapter
    pub fn new(
        config: PoolConfig,
        data_source: Arc<dyn XaDataSource>,
        adapter: Arc<dyn EnlistmentAdapter>,
    ) -> Self {
        Self {
            config,
            data_source,
            adapter,
            slots: Mutex::new(HashMap::new()),
            entry_count: AtomicUsize::new(0),
            opened_count: AtomicUsize::new(0),
            reused_count: AtomicUsize::new(0),
        }
    }

    /// Acquire a connection for the given credential
    ///
    /// With pooling enabled this returns the cached enlisted connection for
    /// the credential, creating it on first use. Cached connections are not
    /// checked out exclusively: concurrent callers for the same credential
    /// share the cached connection. With pooling disabled a new physical
    /// connection is opened every time.
    ///
    /// Data source and adapter errors are returned unchanged and leave no
    /// entry behind.
    #[tracing::instrument(skip(self), fields(credential = %credential, pooled = self.config.enabled()))]
    pub async fn acquire(&self, credential: &Credential) -> Result<ManagedConnection> {
        if !self.config.enabled() {
            let enlisted = self.open(credential).await?;
            return Ok(ManagedConnection::new(enlisted, ReleaseMode::Close));
        }

        let (slot, mut guard) = loop {
            let slot = self.slot_for(credential);
            let guard = slot.clone().lock_owned().await;
            if self.is_current_slot(credential, &slot) {
                break (slot, guard);
            }
            // invalidated or closed while we waited; an entry stored here would be orphaned
            tracing::trace!("slot removed while waiting, retrying");
        };

        if let Some(entry) = guard.as_ref() {
            if entry.is_usable() {
                self.reused_count.fetch_add(1, Ordering::SeqCst);
                tracing::trace!(
                    age_ms = entry.created_at.elapsed().as_millis() as u64,
                    "reusing cached connection"
                );
                return Ok(ManagedConnection::new(
                    entry.enlisted.clone(),
                    ReleaseMode::Retain,
                ));
            }

            tracing::debug!("cached connection is closed, replacing it");
            if let Some(stale) = guard.take() {
                self.entry_count.fetch_sub(1, Ordering::SeqCst);
                if let Err(err) = stale.close().await {
                    tracing::warn!(error = %err, "failed to close stale cached connection");
                }
            }
        }

        match self.open(credential).await {
            Ok(enlisted) => {
                *guard = Some(PooledEntry::new(enlisted.clone()));
                self.entry_count.fetch_add(1, Ordering::SeqCst);
                Ok(ManagedConnection::new(enlisted, ReleaseMode::Retain))
            }
            Err(err) => {
                drop(guard);
                self.discard_empty_slot(credential, &slot);
                Err(err)
            }
        }
    }

    /// Acquire a connection with the data source's default credentials
    pub async fn acquire_default(&self) -> Result<ManagedConnection> {
        self.acquire(&Credential::none()).await
    }

    /// Close and forget the cached connection for a credential
    ///
    /// Returns `true` if an entry existed.
    #[tracing::instrument(skip(self), fields(credential = %credential))]
    pub async fn invalidate(&self, credential: &Credential) -> Result<bool> {
        let slot = { self.slots.lock().remove(credential) };
        let Some(slot) = slot else {
            return Ok(false);
        };

        let entry = slot.lock().await.take();
        match entry {
            Some(entry) => {
                self.entry_count.fetch_sub(1, Ordering::SeqCst);
                tracing::debug!("invalidating cached connection");
                entry.close().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every cached physical connection
    ///
    /// Close failures are logged and do not stop the remaining entries from
    /// being closed. Returns the number of entries removed.
    #[tracing::instrument(skip(self))]
    pub async fn close_all(&self) -> usize {
        let slots: Vec<_> = {
            let mut slots = self.slots.lock();
            slots.drain().collect()
        };

        let mut closed = 0;
        for (credential, slot) in slots {
            let entry = slot.lock().await.take();
            if let Some(entry) = entry {
                self.entry_count.fetch_sub(1, Ordering::SeqCst);
                closed += 1;
                if let Err(err) = entry.close().await {
                    tracing::warn!(credential = %credential, error = %err, "failed to close cached connection");
                }
            }
        }

        tracing::debug!(closed, "connection cache cleared");
        closed
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.entry_count.load(Ordering::SeqCst),
            self.opened_count.load(Ordering::SeqCst),
            self.reused_count.load(Ordering::SeqCst),
        )
    }

    /// Get the cache configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get or insert the slot for a credential
    fn slot_for(&self, credential: &Credential) -> Arc<EntrySlot> {
        let mut slots = self.slots.lock();
        slots
            .entry(credential.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    /// Check that the map still holds this exact slot for the credential
    fn is_current_slot(&self, credential: &Credential, slot: &Arc<EntrySlot>) -> bool {
        self.slots
            .lock()
            .get(credential)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Remove a slot left empty by a failed acquisition
    ///
    /// Only removed when no other caller holds it; a waiter still holding the
    /// slot will retry creation itself.
    fn discard_empty_slot(&self, credential: &Credential, slot: &Arc<EntrySlot>) {
        let mut slots = self.slots.lock();
        let Some(current) = slots.get(credential) else {
            return;
        };
        if !Arc::ptr_eq(current, slot) || Arc::strong_count(slot) > 2 {
            return;
        }
        let is_empty = slot.try_lock().map(|entry| entry.is_none()).unwrap_or(false);
        if is_empty {
            slots.remove(credential);
        }
    }

    /// Open a physical connection and wrap it for the transaction manager
    async fn open(&self, credential: &Credential) -> Result<Arc<dyn EnlistedConnection>> {
        let xa_connection = self.data_source.connect(credential).await.map_err(|err| {
            tracing::warn!(error = %err, "failed to open XA connection");
            err
        })?;
        self.opened_count.fetch_add(1, Ordering::SeqCst);

        match self
            .adapter
            .wrap(xa_connection.clone(), self.config.connection_manager())
            .await
        {
            Ok(enlisted) => {
                tracing::debug!(
                    driver = xa_connection.driver_name(),
                    connection_manager = %self.config.connection_manager(),
                    "opened enlisted connection"
                );
                Ok(enlisted)
            }
            Err(err) => {
                tracing::warn!(error = %err, "enlistment failed, closing physical connection");
                if let Err(close_err) = xa_connection.close().await {
                    tracing::warn!(
                        error = %close_err,
                        "failed to close physical connection after enlistment failure"
                    );
                }
                Err(err)
            }
        }
    }
}
